//! `SeaORM` entities mirroring the inventory schema one-for-one.

pub mod dns_record;
pub mod domain;
pub mod sync_run;

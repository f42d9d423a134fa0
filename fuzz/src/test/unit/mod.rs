pub mod end_to_end;
pub mod ledger;
pub mod provision;
pub mod verify;

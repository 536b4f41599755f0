use crate::errors::ErrorCode;
use crate::types::ConfigKey;
use soroban_sdk::{Address, Env};

pub fn set_admin(e: &Env, admin: Address) {
    e.storage().persistent().set(&ConfigKey::Admin, &admin);
}

pub fn get_admin(e: &Env) -> Option<Address> {
    e.storage().persistent().get(&ConfigKey::Admin)
}

pub fn require_admin(e: &Env) -> Result<(), ErrorCode> {
    let admin: Address = get_admin(e).ok_or(ErrorCode::AdminNotSet)?;
    admin.require_auth();
    Ok(())
}

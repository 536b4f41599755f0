use crate::errors::ErrorCode;
use crate::types::{OaEdit, OaLine};
use soroban_sdk::{contracttype, xdr::ToXdr, Bytes, BytesN, Env, Vec};

/// Operating-agreement line store. Lines only change through
/// digest-bound batches committed by DAO + council co-execution.

pub const OA_ADD_LINE: u32 = 0;
pub const OA_UPDATE_LINE: u32 = 1;
pub const OA_REMOVE_LINE: u32 = 2;
pub const OA_SET_IMMUTABLE: u32 = 3;

#[contracttype]
pub enum DataKey {
    Line(u64, u64),
    /// dao_id -> ordered line ids
    LineOrder(u64),
    /// dao_id -> next line id
    NextLineId(u64),
}

pub fn line_order(e: &Env, dao_id: u64) -> Vec<u64> {
    e.storage()
        .persistent()
        .get(&DataKey::LineOrder(dao_id))
        .unwrap_or_else(|| Vec::new(e))
}

pub fn get_line(e: &Env, dao_id: u64, line_id: u64) -> Result<OaLine, ErrorCode> {
    e.storage()
        .persistent()
        .get(&DataKey::Line(dao_id, line_id))
        .ok_or(ErrorCode::LineNotFound)
}

fn save_line(e: &Env, dao_id: u64, line: &OaLine) {
    e.storage()
        .persistent()
        .set(&DataKey::Line(dao_id, line.id), line);
}

/// Digest binding a council approval to the exact batch: the canonical
/// XDR bytes of every edit in order, hashed with the host's SHA-3
/// primitive. A pure function of the batch content.
pub fn compute_batch_digest(e: &Env, edits: &Vec<OaEdit>) -> BytesN<32> {
    let mut stream = Bytes::new(e);
    for edit in edits.iter() {
        stream.append(&edit.to_xdr(e));
    }
    e.crypto().keccak256(&stream).to_bytes()
}

/// Apply a verified batch in order. Returns the number of edits applied.
pub fn apply_batch(e: &Env, dao_id: u64, edits: &Vec<OaEdit>) -> Result<u32, ErrorCode> {
    for edit in edits.iter() {
        apply_edit(e, dao_id, &edit)?;
    }
    Ok(edits.len())
}

fn apply_edit(e: &Env, dao_id: u64, edit: &OaEdit) -> Result<(), ErrorCode> {
    match edit.action_type {
        OA_ADD_LINE => {
            let text = edit.text.clone().ok_or(ErrorCode::InvalidMessages)?;
            let mut next: u64 = e
                .storage()
                .persistent()
                .get(&DataKey::NextLineId(dao_id))
                .unwrap_or(0);
            next += 1;
            let line = OaLine {
                id: next,
                text,
                difficulty: edit.difficulty.unwrap_or(0),
                immutable: false,
            };
            save_line(e, dao_id, &line);
            let mut order = line_order(e, dao_id);
            order.push_back(next);
            e.storage().persistent().set(&DataKey::LineOrder(dao_id), &order);
            e.storage().persistent().set(&DataKey::NextLineId(dao_id), &next);
            Ok(())
        }
        OA_UPDATE_LINE => {
            let line_id = edit.line_id.ok_or(ErrorCode::LineNotFound)?;
            let text = edit.text.clone().ok_or(ErrorCode::InvalidMessages)?;
            let mut line = get_line(e, dao_id, line_id)?;
            if line.immutable {
                return Err(ErrorCode::LineImmutable);
            }
            line.text = text;
            if let Some(difficulty) = edit.difficulty {
                line.difficulty = difficulty;
            }
            save_line(e, dao_id, &line);
            Ok(())
        }
        OA_REMOVE_LINE => {
            let line_id = edit.line_id.ok_or(ErrorCode::LineNotFound)?;
            let line = get_line(e, dao_id, line_id)?;
            if line.immutable {
                return Err(ErrorCode::LineImmutable);
            }
            e.storage().persistent().remove(&DataKey::Line(dao_id, line_id));
            let order = line_order(e, dao_id);
            let mut pruned = Vec::new(e);
            for id in order.iter() {
                if id != line_id {
                    pruned.push_back(id);
                }
            }
            e.storage().persistent().set(&DataKey::LineOrder(dao_id), &pruned);
            Ok(())
        }
        OA_SET_IMMUTABLE => {
            let line_id = edit.line_id.ok_or(ErrorCode::LineNotFound)?;
            let mut line = get_line(e, dao_id, line_id)?;
            line.immutable = true;
            save_line(e, dao_id, &line);
            Ok(())
        }
        _ => Err(ErrorCode::ActionTypeMismatch),
    }
}

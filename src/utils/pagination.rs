use crate::error::{Error, Result};

/// Row offset of a 1-based `page`. Pages below 1 are treated as 1; pages whose
/// offset does not fit in an `i64` are rejected.
pub fn page_offset(page: i64, per_page: i64) -> Result<i64> {
    (page.max(1) - 1)
        .checked_mul(per_page)
        .ok_or_else(|| Error::BadRequest(format!("page {} is out of range", page)))
}

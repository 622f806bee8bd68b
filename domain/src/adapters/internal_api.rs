use crate::validate::validate_count;
use crate::{Address, CoreError, User, UserPort};

/// Mock user source. Output depends on `count` only, which makes it handy for
/// development and tests when the real listing service is not reachable.
#[derive(Clone, Copy, Debug, Default)]
pub struct InternalUserApi;

impl InternalUserApi {
    pub fn new() -> Self {
        Self
    }
}

impl UserPort for InternalUserApi {
    fn fetch(&self, count: i64) -> Result<Vec<User>, CoreError> {
        let n = validate_count(count)?;
        Ok((0..n)
            .map(|i| User {
                name: format!("josh at {i}"),
                age: u32::try_from(i + 1).unwrap_or(u32::MAX),
                address: Address::Text(format!("my address @ {i}")),
            })
            .collect())
    }
}

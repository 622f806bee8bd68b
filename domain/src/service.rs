use crate::{CoreError, SourceKind, StoredUser, User, UserId, UserPort, UserStore};

/// Facade over a single `UserPort`.
///
/// Call sites are written against the facade only; which source backs it is
/// decided when it is constructed.
pub struct Api<P: UserPort> {
    port: P,
}

impl<P: UserPort> Api<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Fetch `count` users from the wrapped port.
    pub fn users(&self, count: i64) -> Result<Vec<User>, CoreError> {
        self.port.fetch(count)
    }
}

/// Application service moving fetched users into a `UserStore`.
pub struct UserSync<P: UserPort, S: UserStore> {
    api: Api<P>,
    store: S,
    source: SourceKind,
    table: String,
}

impl<P: UserPort, S: UserStore> UserSync<P, S> {
    /// `table` must already exist in `store`.
    pub fn new(api: Api<P>, store: S, source: SourceKind, table: impl Into<String>) -> Self {
        Self {
            api,
            store,
            source,
            table: table.into(),
        }
    }

    /// Fetch `count` users and persist them. Returns the number of rows written.
    pub fn sync(&self, count: i64) -> Result<usize, CoreError> {
        let users = self.api.users(count)?;
        self.persist(&users)
    }

    /// Upsert every user as a stored row. Stops at the first failing write.
    pub fn persist(&self, users: &[User]) -> Result<usize, CoreError> {
        for (index, user) in users.iter().enumerate() {
            let row = StoredUser::from_fetched(UserId::for_source(self.source, index), user);
            self.store.upsert(&self.table, &row)?;
        }
        Ok(users.len())
    }

    /// Read back stored rows.
    pub fn stored(&self, limit: Option<usize>) -> Result<Vec<StoredUser>, CoreError> {
        self.store.select_all(limit)
    }

    pub fn source(&self) -> SourceKind {
        self.source
    }

    /// Hand back the store, e.g. to close it.
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::internal_api::InternalUserApi;
    use crate::adapters::memory_store::MemoryUserStore;
    use crate::{TableSchema, USERS_TABLE};

    struct FailingPort;
    impl UserPort for FailingPort {
        fn fetch(&self, _count: i64) -> Result<Vec<User>, CoreError> {
            Err(CoreError::RequestFailed {
                status: Some(500),
                message: "upstream down".into(),
            })
        }
    }

    fn store() -> MemoryUserStore {
        let s = MemoryUserStore::new();
        s.create_table(&TableSchema::users()).unwrap();
        s
    }

    #[test]
    fn api_delegates_to_port() {
        let api = Api::new(InternalUserApi::new());
        assert_eq!(api.users(4).unwrap(), InternalUserApi::new().fetch(4).unwrap());
        assert!(matches!(api.users(-1), Err(CoreError::InvalidArgument(_))));
    }

    #[test]
    fn api_accepts_boxed_port() {
        let port: Box<dyn UserPort> = Box::new(InternalUserApi::new());
        let api = Api::new(port);
        assert_eq!(api.users(2).unwrap().len(), 2);
    }

    #[test]
    fn api_propagates_port_errors() {
        let api = Api::new(FailingPort);
        let err = api.users(3).unwrap_err();
        assert!(matches!(err, CoreError::RequestFailed { status: Some(500), .. }));
    }

    #[test]
    fn sync_persists_and_reads_back() {
        let svc = UserSync::new(
            Api::new(InternalUserApi::new()),
            store(),
            SourceKind::Internal,
            USERS_TABLE,
        );
        assert_eq!(svc.sync(3).unwrap(), 3);
        let rows = svc.stored(None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].id.as_str(), "internal-0");
        assert_eq!(rows[2].name, "josh at 2");
        assert_eq!(rows[2].email, None);
    }

    #[test]
    fn repeated_sync_does_not_duplicate() {
        let svc = UserSync::new(
            Api::new(InternalUserApi::new()),
            store(),
            SourceKind::Internal,
            USERS_TABLE,
        );
        svc.sync(5).unwrap();
        svc.sync(5).unwrap();
        assert_eq!(svc.stored(None).unwrap().len(), 5);
    }

    #[test]
    fn failed_fetch_writes_nothing() {
        let svc = UserSync::new(Api::new(FailingPort), store(), SourceKind::External, USERS_TABLE);
        assert!(svc.sync(3).is_err());
        assert!(svc.stored(None).unwrap().is_empty());
    }

    #[test]
    fn persist_into_missing_table_fails() {
        let svc = UserSync::new(
            Api::new(InternalUserApi::new()),
            MemoryUserStore::new(),
            SourceKind::Internal,
            USERS_TABLE,
        );
        assert!(matches!(svc.sync(1), Err(CoreError::Storage(_))));
    }
}

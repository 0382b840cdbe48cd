mod sqlite;

pub use sqlite::{MemberStore, ProfileQuery, SortField, SortOrder, StoreError};

mod identity;

pub use identity::{
    bearer_token, AuthError, IdentityClient, IdentityUser, Session, SessionUser, SignIn,
};

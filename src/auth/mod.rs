mod verifier;

#[cfg(test)]
pub(crate) use verifier::tests::bearer_for;
pub use verifier::{AuthError, IdentityVerifier};

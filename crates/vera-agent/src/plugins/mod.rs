//! # Built-in Plugins
//!
//! | Plugin | Methods |
//! |--------|---------|
//! | [`KeyManagerPlugin`] | `keyManagerCreate`, `keyManagerGet`, `keyManagerSign`, `keyManagerGetForIdentifier` |
//! | [`DidManagerPlugin`] | `didManagerGetProviders`, `didManagerCreate`, `didManagerFind`, `didManagerGet`, `didManagerAddKey` |
//! | [`ResolverPlugin`] | `resolveDid` |
//! | [`CredentialPlugin`] | `createVerifiableCredential`, `createVerifiablePresentation`, `verifyCredential`, `verifyPresentation` |
//! | [`SdrPlugin`] | `createSelectiveDisclosureRequest` |
//! | [`MessagePlugin`] | `dataStoreGetMessages` |

pub mod credential;
pub mod did_manager;
pub mod key_manager;
pub mod message;
pub mod resolver;
pub mod sdr;

pub use credential::{
    CreateVerifiableCredential, CreateVerifiablePresentation, CredentialPlugin, VerifyCredential,
    VerifyPresentation,
};
pub use did_manager::{
    DidManagerAddKey, DidManagerCreate, DidManagerFind, DidManagerGet, DidManagerGetProviders,
    DidManagerPlugin,
};
pub use key_manager::{
    KeyManagerCreate, KeyManagerGet, KeyManagerGetForIdentifier, KeyManagerPlugin, KeyManagerSign,
};
pub use message::{DataStoreGetMessages, MessagePlugin};
pub use resolver::{ResolveDid, ResolverPlugin};
pub use sdr::{CreateSelectiveDisclosureRequest, SdrPlugin};

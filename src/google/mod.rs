pub mod client;
pub mod endpoints;
pub mod token;

pub use client::{GoogleApiClient, SheetsDrive};
pub use token::{CredentialStore, GoogleCredential, TokenManager};

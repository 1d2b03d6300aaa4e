pub mod draft;
pub mod machine;
pub mod store;

pub use draft::{CheckoutDraft, CustomerInfo};
pub use machine::{CheckoutExit, CheckoutStep, CheckoutStepMachine, FieldError, MachineError};
pub use store::{CheckoutSessionStore, MemoryBackend, SessionBackend, StoreError, DRAFT_KEY};

use crate::draft::{CheckoutDraft, CustomerInfo};
use cinehold_pricing::Promotion;
use serde::{Deserialize, Serialize};

/// The four checkout steps in combined UI numbering.
///
/// Step 1 exists only for guests, who must supply contact details before
/// anything else; a logged-in member's identity is already known, so a member
/// draft never sits on step 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum CheckoutStep {
    CustomerInfo,
    ComboSelection,
    Payment,
    Confirm,
}

impl CheckoutStep {
    pub fn index(self) -> u8 {
        match self {
            Self::CustomerInfo => 1,
            Self::ComboSelection => 2,
            Self::Payment => 3,
            Self::Confirm => 4,
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::CustomerInfo => Some(Self::ComboSelection),
            Self::ComboSelection => Some(Self::Payment),
            Self::Payment => Some(Self::Confirm),
            Self::Confirm => None,
        }
    }

    fn prev(self) -> Option<Self> {
        match self {
            Self::CustomerInfo => None,
            Self::ComboSelection => Some(Self::CustomerInfo),
            Self::Payment => Some(Self::ComboSelection),
            Self::Confirm => Some(Self::Payment),
        }
    }
}

impl From<CheckoutStep> for u8 {
    fn from(step: CheckoutStep) -> u8 {
        step.index()
    }
}

impl TryFrom<u8> for CheckoutStep {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        match index {
            1 => Ok(Self::CustomerInfo),
            2 => Ok(Self::ComboSelection),
            3 => Ok(Self::Payment),
            4 => Ok(Self::Confirm),
            other => Err(format!("step index out of range: {other}")),
        }
    }
}

/// How a finished machine exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutExit {
    /// The hold TTL reached zero: the booking attempt is over, the draft is
    /// gone, and the user goes back to seat selection
    HoldExpired,
    /// Payment was submitted from the confirm step
    PaymentSubmitted,
}

/// A single field-level validation failure, recoverable by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error("Validation failed on {}", .0.iter().map(|e| e.field).collect::<Vec<_>>().join(", "))]
    Validation(Vec<FieldError>),

    #[error("Invalid transition: {action} from step {from}")]
    InvalidTransition { from: u8, action: &'static str },

    #[error("A server-side booking must exist before leaving the customer info step")]
    BookingRequired,

    #[error("Checkout already finished")]
    Finished,

    #[error("Unusable draft: {0}")]
    InvalidDraft(String),
}

/// Drives the 4-step checkout UI.
///
/// All draft mutation goes through this type, so every change is a single
/// synchronous read-modify-write and re-renders never observe a partial
/// update. The caller persists the draft after each call and clears it when
/// the machine reports an exit.
pub struct CheckoutStepMachine {
    draft: CheckoutDraft,
    guest: bool,
    exit: Option<CheckoutExit>,
}

impl CheckoutStepMachine {
    /// Guest entry: contact details come first
    pub fn new_guest() -> Self {
        Self {
            draft: CheckoutDraft::new(CheckoutStep::CustomerInfo),
            guest: true,
            exit: None,
        }
    }

    /// Member entry: identity is known, start straight at combo selection
    pub fn new_member() -> Self {
        Self {
            draft: CheckoutDraft::new(CheckoutStep::ComboSelection),
            guest: false,
            exit: None,
        }
    }

    /// Resume from a restored draft (same booking, same tab)
    pub fn resume(draft: CheckoutDraft, guest: bool) -> Result<Self, MachineError> {
        if !guest && draft.active_step == CheckoutStep::CustomerInfo {
            return Err(MachineError::InvalidDraft(
                "member draft on the guest-only step".to_string(),
            ));
        }
        Ok(Self { draft, guest, exit: None })
    }

    pub fn step(&self) -> CheckoutStep {
        self.draft.active_step
    }

    pub fn draft(&self) -> &CheckoutDraft {
        &self.draft
    }

    pub fn exit(&self) -> Option<CheckoutExit> {
        self.exit
    }

    pub fn is_finished(&self) -> bool {
        self.exit.is_some()
    }

    // -- draft mutation ----------------------------------------------------

    pub fn set_customer(&mut self, customer: CustomerInfo) -> Result<(), MachineError> {
        self.ensure_live()?;
        self.draft.customer = Some(customer);
        Ok(())
    }

    pub fn set_combo(
        &mut self,
        combo_id: &str,
        name: &str,
        unit_price: i64,
        quantity: u32,
    ) -> Result<(), MachineError> {
        self.ensure_live()?;
        self.draft.selected_combos.set(combo_id, name, unit_price, quantity);
        Ok(())
    }

    pub fn set_payment_method(&mut self, method: impl Into<String>) -> Result<(), MachineError> {
        self.ensure_live()?;
        self.draft.payment_method = Some(method.into());
        Ok(())
    }

    pub fn apply_promotion(&mut self, promotion: Promotion) -> Result<(), MachineError> {
        self.ensure_live()?;
        self.draft.applied_promotion = Some(promotion);
        Ok(())
    }

    pub fn remove_promotion(&mut self) -> Result<(), MachineError> {
        self.ensure_live()?;
        self.draft.applied_promotion = None;
        Ok(())
    }

    pub fn set_rank_discount(&mut self, enabled: bool, percentage: f64) -> Result<(), MachineError> {
        self.ensure_live()?;
        self.draft.rank_discount = cinehold_pricing::RankDiscount { enabled, percentage };
        Ok(())
    }

    // -- transitions -------------------------------------------------------

    /// Advance one step if the current step's validation passes.
    ///
    /// Leaving the customer-info step additionally requires that a booking
    /// exists; a guest whose details validate but who has no booking yet gets
    /// `BookingRequired` and the caller creates one, then calls
    /// `booking_created`.
    pub fn next(&mut self) -> Result<CheckoutStep, MachineError> {
        self.ensure_live()?;

        match self.draft.active_step {
            CheckoutStep::CustomerInfo => {
                validate_customer(self.draft.customer.as_ref())?;
                if self.draft.booking_id.is_none() {
                    return Err(MachineError::BookingRequired);
                }
            }
            CheckoutStep::ComboSelection => {
                // No validation: an empty combo selection is fine
            }
            CheckoutStep::Payment => {
                if self.draft.payment_method.as_deref().unwrap_or("").trim().is_empty() {
                    return Err(MachineError::Validation(vec![FieldError {
                        field: "paymentMethod",
                        message: "Choose a payment method".to_string(),
                    }]));
                }
            }
            CheckoutStep::Confirm => {
                return Err(MachineError::InvalidTransition {
                    from: self.draft.active_step.index(),
                    action: "next",
                });
            }
        }

        // Confirm is reachable from Payment, so next() always exists here
        if let Some(step) = self.draft.active_step.next() {
            self.draft.active_step = step;
        }
        Ok(self.draft.active_step)
    }

    /// Go back one step; nothing collected so far is discarded
    pub fn prev(&mut self) -> Result<CheckoutStep, MachineError> {
        self.ensure_live()?;

        let floor = if self.guest {
            CheckoutStep::CustomerInfo
        } else {
            CheckoutStep::ComboSelection
        };

        match self.draft.active_step.prev() {
            Some(step) if step >= floor => {
                self.draft.active_step = step;
                Ok(step)
            }
            _ => Err(MachineError::InvalidTransition {
                from: self.draft.active_step.index(),
                action: "prev",
            }),
        }
    }

    /// Guest flow: the customer-info step created a server-side booking from
    /// the held seats. Attach its id and move into combo selection.
    pub fn booking_created(&mut self, booking_id: impl Into<String>) -> Result<CheckoutStep, MachineError> {
        self.ensure_live()?;

        if self.draft.active_step != CheckoutStep::CustomerInfo {
            return Err(MachineError::InvalidTransition {
                from: self.draft.active_step.index(),
                action: "booking_created",
            });
        }
        validate_customer(self.draft.customer.as_ref())?;

        self.draft.booking_id = Some(booking_id.into());
        self.draft.active_step = CheckoutStep::ComboSelection;
        Ok(self.draft.active_step)
    }

    /// The hold TTL hit zero. Terminal from any step, and it wins over any
    /// in-flight user action: the machine finishes, the caller clears the
    /// persisted draft and sends the user back to seat selection.
    pub fn hold_expired(&mut self) -> Result<CheckoutExit, MachineError> {
        self.ensure_live()?;

        tracing::info!(step = self.draft.active_step.index(), "hold expired, checkout abandoned");
        self.exit = Some(CheckoutExit::HoldExpired);
        Ok(CheckoutExit::HoldExpired)
    }

    /// Terminal success from the confirm step
    pub fn payment_submitted(&mut self) -> Result<CheckoutExit, MachineError> {
        self.ensure_live()?;

        if self.draft.active_step != CheckoutStep::Confirm {
            return Err(MachineError::InvalidTransition {
                from: self.draft.active_step.index(),
                action: "payment_submitted",
            });
        }

        self.exit = Some(CheckoutExit::PaymentSubmitted);
        Ok(CheckoutExit::PaymentSubmitted)
    }

    fn ensure_live(&self) -> Result<(), MachineError> {
        if self.exit.is_some() {
            return Err(MachineError::Finished);
        }
        Ok(())
    }
}

fn validate_customer(customer: Option<&CustomerInfo>) -> Result<(), MachineError> {
    let mut errors = Vec::new();

    match customer {
        None => {
            errors.push(FieldError { field: "name", message: "Name is required".to_string() });
            errors.push(FieldError { field: "email", message: "Email is required".to_string() });
            errors.push(FieldError { field: "phone", message: "Phone is required".to_string() });
        }
        Some(info) => {
            if info.name.trim().is_empty() {
                errors.push(FieldError { field: "name", message: "Name is required".to_string() });
            }
            let email = info.email.trim();
            if email.is_empty() || !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
                errors.push(FieldError { field: "email", message: "Enter a valid email".to_string() });
            }
            let digits = info.phone.chars().filter(char::is_ascii_digit).count();
            if digits < 8 {
                errors.push(FieldError { field: "phone", message: "Enter a valid phone number".to_string() });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(MachineError::Validation(errors))
    }
}

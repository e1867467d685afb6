use serde::{Deserialize, Serialize};

/// The current step of the onboarding dialogue. Linear with one branch:
/// `AwaitingIntro → AwaitingName → AwaitingPhone → [ConfirmWhatsapp] →
/// ChoosePath → {ReadyAi | redirect}`. A redirect leaves the phase at
/// `ChoosePath` so the visitor can pick again; `ReadyAi` is absorbing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingIntro,
    AwaitingName,
    AwaitingPhone,
    ConfirmWhatsapp,
    ChoosePath,
    ReadyAi,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingIntro => "awaiting_intro",
            Self::AwaitingName => "awaiting_name",
            Self::AwaitingPhone => "awaiting_phone",
            Self::ConfirmWhatsapp => "confirm_whatsapp",
            Self::ChoosePath => "choose_path",
            Self::ReadyAi => "ready_ai",
        }
    }
}

/// Fields collected during onboarding. `phone_digits` holds a 10-digit
/// number while the WhatsApp question is pending; `phone_e164` is the
/// normalized `+55...` form. `whatsapp_confirmed` keeps the visitor's
/// answer even though the flow does not branch on it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectedFields {
    pub name: Option<String>,
    pub phone_digits: Option<String>,
    pub phone_e164: Option<String>,
    pub whatsapp_confirmed: Option<bool>,
}

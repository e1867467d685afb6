//! Classification of untrusted free-text input before it reaches the
//! transition function. Commands follow the tokens the widget sends:
//! `/limpar`, `/atendente`, `/menu`, `/choose:ai`, `/choose:dept_<id>`.

/// One inbound message, classified. Anything that is not a recognized
/// command token is `Text`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedInput {
    /// `/limpar` - reset the session to first contact.
    Clear,
    /// `/atendente` or `/menu` - show the handoff menu from any phase.
    Handoff,
    /// `/choose:ai` - the structured AI-path pick.
    ChooseAi,
    /// `/choose:dept_<id>` - the structured department pick.
    ChooseDepartment(u32),
    Text(String),
}

impl ParsedInput {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_lowercase();

        if lowered.contains("/limpar") {
            return Self::Clear;
        }
        if lowered.contains("/atendente") || lowered.contains("/menu") {
            return Self::Handoff;
        }
        if let Some(choice) = lowered.strip_prefix("/choose:") {
            if choice == "ai" {
                return Self::ChooseAi;
            }
            if let Some(id) = choice.strip_prefix("dept_") {
                if let Ok(id) = id.parse::<u32>() {
                    return Self::ChooseDepartment(id);
                }
            }
            // A malformed choice token falls through as plain text so the
            // state machine can re-prompt instead of erroring.
        }

        Self::Text(trimmed.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
}

const YES_TOKENS: [&str; 7] = ["sim", "s", "ok", "claro", "isso", "pode ser", "aham"];
const NO_TOKENS: [&str; 5] = ["não", "nao", "n", "negativo", "no"];

/// Case-insensitive yes/no recognition for the WhatsApp confirmation.
/// `None` means "not a recognizable answer" and keeps the phase unchanged.
pub fn parse_yes_no(raw: &str) -> Option<Answer> {
    let normalized = raw.trim().to_lowercase();
    if YES_TOKENS.contains(&normalized.as_str()) {
        return Some(Answer::Yes);
    }
    if NO_TOKENS.contains(&normalized.as_str()) {
        return Some(Answer::No);
    }
    None
}

/// Keep only ASCII digits, discarding spaces, dashes, parentheses and a
/// leading `+`.
pub fn strip_digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Brazilian numbers only: an 11-digit mobile or 10-digit landline becomes
/// `+55` followed by the digits.
pub fn to_e164(digits: &str) -> String {
    format!("+55{digits}")
}

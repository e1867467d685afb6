use crate::dialogue::input::{parse_yes_no, strip_digits, to_e164, Answer, ParsedInput};
use crate::dialogue::replies;
use crate::dialogue::states::{CollectedFields, Phase};
use crate::domain::department::Department;
use crate::domain::response::DialogueResponse;

/// Read-only context the transition function consumes: the fields collected
/// so far plus the ordered department list for menu rendering.
#[derive(Clone, Copy, Debug)]
pub struct DialogueContext<'a> {
    pub collected: &'a CollectedFields,
    pub departments: &'a [Department],
}

/// What the caller must answer with: either a terminal response, or a
/// delegation of the raw message to the completion orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepReply {
    Respond(DialogueResponse),
    Delegate { message: String },
}

/// Side effects the caller performs after applying a transition. The
/// transition function itself never touches the store or the stats sink.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepAction {
    ClearSession,
    RecordDepartment { id: u32, name: String },
    RecordHandoff,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    pub next_phase: Phase,
    pub collected: CollectedFields,
    pub reply: StepReply,
    pub actions: Vec<StepAction>,
}

impl StepOutcome {
    fn respond(next_phase: Phase, collected: CollectedFields, response: DialogueResponse) -> Self {
        Self { next_phase, collected, reply: StepReply::Respond(response), actions: Vec::new() }
    }

    fn with_action(mut self, action: StepAction) -> Self {
        self.actions.push(action);
        self
    }
}

/// Apply one inbound message to the dialogue. Pure: no I/O, no clock, no
/// randomness. Malformed input maps to a re-prompt in the same phase; the
/// only resets are the clear command and the generic fall-through.
pub fn step(current: Phase, input: &ParsedInput, context: &DialogueContext) -> StepOutcome {
    // Global overrides win over any phase.
    match input {
        ParsedInput::Clear => {
            return StepOutcome::respond(
                Phase::AwaitingIntro,
                CollectedFields::default(),
                DialogueResponse::reply(replies::SESSION_CLEARED, Phase::AwaitingIntro),
            )
            .with_action(StepAction::ClearSession);
        }
        ParsedInput::Handoff => {
            return StepOutcome::respond(
                Phase::ChoosePath,
                context.collected.clone(),
                DialogueResponse::menu(replies::MENU_HANDOFF, context.departments),
            )
            .with_action(StepAction::RecordHandoff);
        }
        _ => {}
    }

    match (current, input) {
        (Phase::AwaitingIntro, _) => StepOutcome::respond(
            Phase::AwaitingName,
            context.collected.clone(),
            DialogueResponse::reply(replies::GREETING, Phase::AwaitingName),
        ),

        (Phase::AwaitingName, ParsedInput::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.chars().count() < 3 {
                return StepOutcome::respond(
                    Phase::AwaitingName,
                    context.collected.clone(),
                    DialogueResponse::reply(replies::NAME_TOO_SHORT, Phase::AwaitingName),
                );
            }
            let mut collected = context.collected.clone();
            collected.name = Some(trimmed.to_string());
            StepOutcome::respond(
                Phase::AwaitingPhone,
                collected,
                DialogueResponse::reply(replies::ASK_PHONE, Phase::AwaitingPhone),
            )
        }

        (Phase::AwaitingPhone, ParsedInput::Text(text)) => {
            let digits = strip_digits(text);
            match digits.chars().count() {
                11 => {
                    let mut collected = context.collected.clone();
                    collected.phone_e164 = Some(to_e164(&digits));
                    collected.phone_digits = Some(digits);
                    StepOutcome::respond(
                        Phase::ChoosePath,
                        collected,
                        DialogueResponse::menu(replies::MENU_INTRO, context.departments),
                    )
                }
                10 => {
                    // Landline-shaped; ambiguous whether it is WhatsApp.
                    let mut collected = context.collected.clone();
                    collected.phone_digits = Some(digits);
                    StepOutcome::respond(
                        Phase::ConfirmWhatsapp,
                        collected,
                        DialogueResponse::reply(replies::ASK_WHATSAPP, Phase::ConfirmWhatsapp),
                    )
                }
                _ => StepOutcome::respond(
                    Phase::AwaitingPhone,
                    context.collected.clone(),
                    DialogueResponse::reply(replies::PHONE_INVALID, Phase::AwaitingPhone),
                ),
            }
        }

        (Phase::ConfirmWhatsapp, ParsedInput::Text(text)) => match parse_yes_no(text) {
            Some(answer) => {
                // Either answer proceeds; the number is normalized the same
                // way and the answer itself is kept on the record.
                let mut collected = context.collected.clone();
                if let Some(digits) = collected.phone_digits.as_deref() {
                    collected.phone_e164 = Some(to_e164(digits));
                }
                collected.whatsapp_confirmed = Some(matches!(answer, Answer::Yes));
                StepOutcome::respond(
                    Phase::ChoosePath,
                    collected,
                    DialogueResponse::menu(replies::MENU_INTRO, context.departments),
                )
            }
            None => StepOutcome::respond(
                Phase::ConfirmWhatsapp,
                context.collected.clone(),
                DialogueResponse::reply(replies::WHATSAPP_REPROMPT, Phase::ConfirmWhatsapp),
            ),
        },

        (Phase::ChoosePath, ParsedInput::ChooseAi) => StepOutcome::respond(
            Phase::ReadyAi,
            context.collected.clone(),
            DialogueResponse::reply(replies::AI_INTRO, Phase::ReadyAi),
        ),

        (Phase::ChoosePath, ParsedInput::ChooseDepartment(id)) => {
            match context.departments.iter().find(|department| department.id == *id) {
                Some(department) => StepOutcome::respond(
                    Phase::ChoosePath,
                    context.collected.clone(),
                    DialogueResponse::redirect(
                        replies::redirect_text(&department.name),
                        department.whatsapp_url(),
                    ),
                )
                .with_action(StepAction::RecordDepartment {
                    id: department.id,
                    name: department.name.clone(),
                }),
                None => StepOutcome::respond(
                    Phase::ChoosePath,
                    context.collected.clone(),
                    DialogueResponse::reply(replies::DEPARTMENT_NOT_FOUND, Phase::ChoosePath),
                ),
            }
        }

        (Phase::ReadyAi, ParsedInput::Text(text)) => StepOutcome {
            next_phase: Phase::ReadyAi,
            collected: context.collected.clone(),
            reply: StepReply::Delegate { message: text.clone() },
            actions: Vec::new(),
        },

        // Garbage in ChoosePath and choice tokens outside it: the one path
        // that resets the phase. Collected fields survive the reset.
        _ => StepOutcome::respond(
            Phase::AwaitingIntro,
            context.collected.clone(),
            DialogueResponse::reply(replies::SOMETHING_WENT_WRONG, Phase::AwaitingIntro),
        ),
    }
}

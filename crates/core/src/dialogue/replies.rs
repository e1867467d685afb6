//! Canned PT-BR dialogue texts. Centralized so the transition function and
//! the HTTP layer never drift apart on wording.

pub const GREETING: &str =
    "Olá! 👋 Eu sou a Isa, assistente virtual. Pra começar, me diga seu nome.";

pub const NAME_TOO_SHORT: &str =
    "Hmm, não consegui entender. Pode me dizer seu nome completo? (pelo menos 3 letras)";

pub const ASK_PHONE: &str = "Prazer! 😊 Agora me passa seu telefone com DDD, por favor.";

pub const PHONE_INVALID: &str =
    "Esse número não parece completo. Me manda o telefone com DDD (10 ou 11 dígitos).";

pub const ASK_WHATSAPP: &str = "Esse número é WhatsApp? (sim/não)";

pub const WHATSAPP_REPROMPT: &str = "Só preciso de um sim ou não: esse número é WhatsApp?";

pub const MENU_INTRO: &str = "Perfeito, obrigada! Como você prefere continuar?";

pub const MENU_HANDOFF: &str = "Claro! Escolha com quem você quer falar:";

pub const AI_INTRO: &str = "Combinado! 🤖 Me conta o que você precisa.";

pub const DEPARTMENT_NOT_FOUND: &str =
    "Não encontrei esse setor. Escolha uma das opções do menu, por favor.";

pub const SESSION_CLEARED: &str = "Conversa limpa! Quando quiser, é só mandar uma mensagem. 👋";

pub const SOMETHING_WENT_WRONG: &str =
    "Ops, algo deu errado por aqui. 🙏 Me manda qualquer mensagem para recomeçarmos.";

pub const AI_UNAVAILABLE: &str = "Nossa assistente está temporariamente indisponível. \
     Tente novamente em alguns minutos ou digite /atendente para falar com uma pessoa.";

pub fn redirect_text(department_name: &str) -> String {
    format!("Abrindo o WhatsApp do setor {department_name}... 📲")
}

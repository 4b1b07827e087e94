use axum::{Json, http::StatusCode, response::IntoResponse};

use ripple_types::api::{SupportMessageRequest, SupportReply};

/// Scripted greeting shown when the support chat opens. Nothing is stored;
/// the whole exchange lives in the client.
const GREETING: [&str; 2] = [
    "Olá! Bem-vindo ao suporte da Ripple. Como posso ajudar você hoje?",
    "Posso ajudar com:\n- Dúvidas sobre sua conta\n- Problemas técnicos\n- Sugestões de recursos\n- Outras questões",
];

/// Keyword table scanned in order; the first keyword contained in the
/// (lowercased) message wins.
const AUTO_RESPONSES: [(&str, &str); 8] = [
    (
        "conta",
        "Para questões relacionadas à sua conta, você pode acessar a página de configurações em /settings ou alterar seu perfil em /profile/edit.",
    ),
    (
        "senha",
        "Para redefinir sua senha, use a opção 'Esqueci minha senha' na tela de login ou acesse as configurações da sua conta.",
    ),
    (
        "problema",
        "Lamento pelo inconveniente. Poderia descrever o problema com mais detalhes para que possamos ajudar melhor?",
    ),
    (
        "bug",
        "Obrigado por relatar. Poderia fornecer mais detalhes sobre o bug, como em qual página ocorreu e quais passos você seguiu?",
    ),
    (
        "sugestão",
        "Agradecemos sua sugestão! Vamos analisar e considerar para futuras atualizações da plataforma.",
    ),
    (
        "recurso",
        "Estamos sempre trabalhando para melhorar a Ripple. Sua sugestão de recurso será encaminhada para nossa equipe de produto.",
    ),
    (
        "obrigado",
        "Disponha! Estamos aqui para ajudar. Há mais alguma coisa em que possamos auxiliar?",
    ),
    (
        "ajuda",
        "Claro! Em que posso ajudar? Por favor, descreva sua dúvida ou problema com mais detalhes.",
    ),
];

const FALLBACK: &str =
    "Obrigado por sua mensagem. Nossa equipe de suporte irá analisá-la e responder em breve.";

/// Pick the canned reply for a user message.
fn reply_for(message: &str) -> &'static str {
    let lowered = message.to_lowercase();
    AUTO_RESPONSES
        .iter()
        .find(|(keyword, _)| lowered.contains(keyword))
        .map(|(_, response)| *response)
        .unwrap_or(FALLBACK)
}

pub async fn greeting() -> impl IntoResponse {
    let messages: Vec<SupportReply> = GREETING
        .iter()
        .map(|m| SupportReply { reply: (*m).to_string() })
        .collect();
    Json(messages)
}

pub async fn respond(
    Json(req): Json<SupportMessageRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.content.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    Ok(Json(SupportReply {
        reply: reply_for(&req.content).to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive() {
        assert!(reply_for("Estou com um PROBLEMA no feed").contains("Lamento pelo inconveniente"));
    }

    #[test]
    fn first_keyword_in_table_order_wins() {
        // "conta" precedes "senha" in the table, so it wins even though both
        // keywords appear in the message
        let reply = reply_for("esqueci a senha da minha conta");
        assert!(reply.contains("questões relacionadas à sua conta"));
    }

    #[test]
    fn unmatched_message_gets_fallback() {
        assert_eq!(reply_for("oi"), FALLBACK);
    }

    #[test]
    fn keyword_inside_word_still_matches() {
        // Substring semantics, not word-boundary semantics
        assert!(reply_for("encontrei um bugzinho").contains("Obrigado por relatar"));
    }
}

use crate::cache::{CacheKey, ResponseCache};
use crate::models::{ChatMode, SamplingOptions};
use crate::normalize::char_len;
use crate::traits::TextGenerator;
use tracing::{debug, warn};

pub const EMPTY_QUESTION_MESSAGE: &str =
    "Por favor escribe una pregunta sobre las aves o los documentos cargados.";
pub const INSUFFICIENT_CONTEXT_MESSAGE: &str = "No encontré información relevante en los documentos cargados para responder esta pregunta. Intenta reformularla o usa el modo investigativo.";
pub const NO_ANSWER_MESSAGE: &str = "No se pudo generar una respuesta.";
pub const BACKEND_UNAVAILABLE_MESSAGE: &str = "No fue posible conectar con el servicio de generación de respuestas. Intenta de nuevo en unos minutos.";
pub const DEGRADED_ANSWER_PREFIX: &str = "El servicio de generación no está disponible en este momento. Este es un extracto de los documentos relacionados con tu pregunta:";

/// Strict mode refuses to generate from less context than this.
pub const MIN_STRICT_CONTEXT_CHARS: usize = 200;
/// Below this much context a backend failure yields the connectivity message
/// instead of an excerpt.
pub const MIN_EXCERPT_CONTEXT_CHARS: usize = 300;
pub const EXCERPT_CHARS: usize = 800;
/// Generated answers must be longer than this to be cached.
pub const MIN_CACHEABLE_ANSWER_CHARS: usize = 50;

pub fn build_prompt(question: &str, context: &str, mode: ChatMode) -> String {
    match mode {
        ChatMode::Strict => format!(
            "Eres un asistente experto en aves de Colombia. Responde ÚNICAMENTE con la \
             información del contexto proporcionado. Si el contexto no es suficiente, dilo \
             explícitamente e indica qué información falta. No inventes datos.\n\n\
             CONTEXTO:\n{context}\n\nPREGUNTA: {question}\n\nRESPUESTA:"
        ),
        ChatMode::Investigative => format!(
            "Eres un asistente experto en aves de Colombia. Usa el contexto proporcionado como \
             fuente principal y compleméntalo con tu conocimiento general de ornitología. \
             Cuando el contexto y tu conocimiento difieran, da prioridad al contexto.\n\n\
             CONTEXTO:\n{context}\n\nPREGUNTA: {question}\n\nRESPUESTA:"
        ),
    }
}

fn degraded_answer(context: &str) -> String {
    if char_len(context) >= MIN_EXCERPT_CONTEXT_CHARS {
        let excerpt = context.chars().take(EXCERPT_CHARS).collect::<String>();
        format!("{DEGRADED_ANSWER_PREFIX}\n\n{excerpt}...")
    } else {
        BACKEND_UNAVAILABLE_MESSAGE.to_string()
    }
}

/// Turns retrieved context into an answer. Never fails: every backend problem
/// resolves to some text.
pub struct AnswerOrchestrator<G> {
    generator: G,
}

impl<G> AnswerOrchestrator<G>
where
    G: TextGenerator,
{
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    pub async fn answer(
        &self,
        question: &str,
        context: &str,
        mode: ChatMode,
        cache: &dyn ResponseCache,
    ) -> String {
        let key = CacheKey::new(question, mode);
        if let Some(cached) = cache.get(&key) {
            debug!(mode = mode.as_str(), "answer served from cache");
            return cached;
        }

        if mode.is_strict() && char_len(context) < MIN_STRICT_CONTEXT_CHARS {
            debug!(context_chars = char_len(context), "not enough context for strict mode");
            return INSUFFICIENT_CONTEXT_MESSAGE.to_string();
        }

        let prompt = build_prompt(question, context, mode);
        let options = SamplingOptions::for_mode(mode);

        match self.generator.generate(&prompt, &options).await {
            Ok(generated) => {
                let generated = generated.trim().to_string();
                if generated.is_empty() {
                    return NO_ANSWER_MESSAGE.to_string();
                }
                if char_len(&generated) > MIN_CACHEABLE_ANSWER_CHARS {
                    cache.insert(key, generated.clone());
                }
                generated
            }
            Err(error) => {
                warn!(%error, mode = mode.as_str(), "generation backend failed");
                degraded_answer(context)
            }
        }
    }
}

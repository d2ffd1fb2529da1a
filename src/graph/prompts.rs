// Prompt templates
// Built-in Spanish instructions, optionally overridden from a directory

use std::io;
use std::path::Path;

use super::state::LearningStyle;

/// Fixed answer of the reject stage.
pub const REFUSAL_MESSAGE: &str = "Lo siento, no puedo contestar tu pregunta.";

const ROUTER_FILE: &str = "node_router.txt";
const KINESTHETIC_FILE: &str = "node_chat_kinestesico.txt";
const VISUAL_FILE: &str = "node_chat_visual.txt";

const DEFAULT_ROUTER_PROMPT: &str = "\
Eres el clasificador de preguntas de Alexandria, un asistente educativo.
Decide si la pregunta del usuario es una consulta académica o de estudio que \
puede responderse con los materiales del curso.
Responde true si la pregunta es educativa y está dentro de ese alcance.
Responde false si es ofensiva, personal, ajena al aprendizaje o pide \
información que no puede estar en los materiales (por ejemplo noticias \
recientes o datos del propio usuario).
Devuelve únicamente el campo `response` con un valor booleano.";

const DEFAULT_KINESTHETIC_PROMPT: &str = "\
Eres Alexandria, una tutora para estudiantes con estilo de aprendizaje kinestésico.
Responde usando solo la información proporcionada.
Explica a través de actividades prácticas, ejemplos que el estudiante pueda \
hacer con las manos y pasos concretos para experimentar el concepto.
Si la información no alcanza para responder, dilo con claridad.
Responde en español y devuelve el texto en el campo `response`.";

const DEFAULT_VISUAL_PROMPT: &str = "\
Eres Alexandria, una tutora para estudiantes con estilo de aprendizaje visual.
Responde usando solo la información proporcionada.
Organiza la explicación con listas, esquemas y comparaciones que se puedan \
imaginar como diagramas, y menciona imágenes o videos de apoyo cuando existan.
Si la información no alcanza para responder, dilo con claridad.
Responde en español y devuelve el texto en el campo `response`.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSet {
    router: String,
    kinesthetic: String,
    visual: String,
}

impl Default for PromptSet {
    fn default() -> Self {
        Self {
            router: DEFAULT_ROUTER_PROMPT.to_string(),
            kinesthetic: DEFAULT_KINESTHETIC_PROMPT.to_string(),
            visual: DEFAULT_VISUAL_PROMPT.to_string(),
        }
    }
}

impl PromptSet {
    /// Built-in templates, with any of the three files present in `dir`
    /// taking their place.
    pub fn load(dir: Option<&Path>) -> io::Result<Self> {
        let mut prompts = Self::default();
        let Some(dir) = dir else {
            return Ok(prompts);
        };

        if let Some(text) = read_override(dir, ROUTER_FILE)? {
            prompts.router = text;
        }
        if let Some(text) = read_override(dir, KINESTHETIC_FILE)? {
            prompts.kinesthetic = text;
        }
        if let Some(text) = read_override(dir, VISUAL_FILE)? {
            prompts.visual = text;
        }
        Ok(prompts)
    }

    pub fn router(&self) -> &str {
        &self.router
    }

    /// Visual is the explicit fallback when no style was given.
    pub fn for_style(&self, style: LearningStyle) -> &str {
        match style {
            LearningStyle::Kinesthetic => &self.kinesthetic,
            LearningStyle::Visual | LearningStyle::None => &self.visual,
        }
    }
}

fn read_override(dir: &Path, file: &str) -> io::Result<Option<String>> {
    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(text) if !text.trim().is_empty() => {
            tracing::info!("Loaded prompt override {}", path.display());
            Ok(Some(text))
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

pub fn router_input(question: &str) -> String {
    format!("Responde a la siguiente pregunta: {}", question)
}

pub fn answer_input(context: &str, question: &str) -> String {
    format!(
        "Basado en la siguiente información: {}, responde a la pregunta: {}",
        context, question
    )
}

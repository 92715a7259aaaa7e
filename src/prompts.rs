use crate::llm::Message;

pub const DEFAULT_LEAD_STYLE: &str = "straight";
pub const DEFAULT_NARRATIVE_OPTION: &str = "chronological";

const LEAD_SYSTEM: &str = "You are an experienced news editor. You write accurate, engaging lead \
paragraphs. Never invent facts that are not present in the article.";

const NARRATIVE_SYSTEM: &str = "You are a feature writer who reshapes finished news stories into \
narrative pieces. Keep every fact, quote and attribution from the original story intact.";

/// Guidance for the named lead styles; anything else is used verbatim.
fn lead_guidance(style: &str) -> String {
    match style.trim().to_ascii_lowercase().as_str() {
        "straight" | "hard" | "summary" => {
            "Write a straight news lead: who, what, when, where and why in a single sentence of \
             no more than 35 words."
                .to_string()
        }
        "anecdotal" => "Write an anecdotal lead that opens on a specific person or moment from the \
                        article, then ties it to the larger news."
            .to_string(),
        "question" => "Write a lead that opens with a pointed question the article answers.".to_string(),
        "quote" => "Write a lead built around the strongest direct quote in the article, quoted \
                    exactly."
            .to_string(),
        "scene" | "descriptive" => "Write a descriptive lead that sets the scene using concrete details \
                                    from the article."
            .to_string(),
        other => format!("Write a lead paragraph in this style: {}.", other),
    }
}

fn narrative_guidance(option: &str) -> String {
    match option.trim().to_ascii_lowercase().as_str() {
        "chronological" => "Retell the story in chronological order, from the earliest event to the \
                            latest."
            .to_string(),
        "character" | "character-driven" => "Retell the story through the eyes of the person most \
                                             affected by it."
            .to_string(),
        "scene" | "scene-by-scene" => "Retell the story as a sequence of scenes, each anchored in a \
                                       place and moment."
            .to_string(),
        "explainer" => "Retell the story as an explainer that walks the reader through what happened \
                        and why it matters."
            .to_string(),
        other => format!("Retell the story using this narrative approach: {}.", other),
    }
}

pub fn lead_messages(article_text: &str, style: &str) -> Vec<Message> {
    let mut user = String::with_capacity(article_text.len() + 200);
    user.push_str(&lead_guidance(style));
    user.push_str(" Return only the lead paragraph, without a headline or commentary.\n\nArticle:\n");
    user.push_str(article_text.trim());

    vec![Message::system(LEAD_SYSTEM), Message::user(user)]
}

pub fn narrative_messages(final_story: &str, narrative_option: &str) -> Vec<Message> {
    let mut user = String::with_capacity(final_story.len() + 200);
    user.push_str(&narrative_guidance(narrative_option));
    user.push_str(" Return only the rewritten story as plain paragraphs.\n\nStory:\n");
    user.push_str(final_story.trim());

    vec![Message::system(NARRATIVE_SYSTEM), Message::user(user)]
}

/// Trims the reply and strips a wrapping code fence or quotes some models add.
pub fn clean_reply(text: &str) -> String {
    let mut text = text.trim();

    if let Some(inner) = text.strip_prefix("```") {
        // Drop the optional language tag on the fence line
        let inner = inner.split_once('\n').map(|(_, rest)| rest).unwrap_or(inner);
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    if text.len() >= 2 && text.starts_with('"') && text.ends_with('"') && !text[1..text.len() - 1].contains('"') {
        text = &text[1..text.len() - 1];
    }

    text.trim().to_string()
}

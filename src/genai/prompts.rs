//! Prompt builders for every collaborator call.

/// Fixed look shared by every illustration so a topic's cards match.
pub const ILLUSTRATION_STYLE: &str = "Illustration style: Modern flat illustration with clean lines \
    and a soft, muted color palette. Details are minimal but effective, focusing on essential \
    elements, subtle shadows for depth, and distinct objects. The overall aesthetic is warm, \
    inviting, and slightly whimsical, reminiscent of casual lifestyle or explainer video graphics. \
    The style avoids harsh outlines or heavy shading, opting for a light and airy feel.";

/// Ask for `count` entries as a bare JSON array of four-field objects.
pub fn word_list_prompt(topic: &str, count: usize) -> String {
    format!(
        "You are a helpful assistant that generates Finnish vocabulary with translations and \
         example sentences. For the topic '{topic}', provide exactly {count} distinct Finnish \
         words as a JSON array of objects. Each object must have exactly four fields (no extra \
         fields):\n\
         - \"word\": the Finnish word (single word only)\n\
         - \"translation\": the English translation (one word if possible)\n\
         - \"example\": a simple, natural example sentence in Finnish that uses the word\n\
         - \"example_translation\": the English translation of the example sentence\n\
         Return ONLY valid JSON, no prose. Example format:\n\
         [{{\"word\":\"aurinko\",\"translation\":\"sun\",\"example\":\"Aurinko paistaa.\",\
         \"example_translation\":\"The sun shines.\"}}]"
    )
}

/// Ask for `CORRECT` or a JSON correction object for one entry.
pub fn grammar_prompt(word: &str, translation: &str, example: &str, example_translation: &str) -> String {
    format!(
        "You are a Finnish language expert. Verify this vocabulary entry.\n\n\
         Word: {word}\n\
         English translation: {translation}\n\
         Finnish example: {example}\n\
         English example translation: {example_translation}\n\n\
         Check for these issues:\n\
         1. Is this a real Finnish word (not a placeholder like 'esimerkki' or 'sana')?\n\
         2. Is the Finnish word spelled correctly?\n\
         3. Does the English translation accurately match the Finnish word?\n\
         4. Is the Finnish example sentence grammatically correct and natural?\n\
         5. Does the example use the word meaningfully (not just 'Tämä on ...')?\n\
         6. Does the English translation match the Finnish example?\n\n\
         If EVERYTHING is correct, respond with exactly: CORRECT\n\n\
         If there are ANY issues, respond with corrections in this JSON format:\n\
         {{\n  \"word\": \"corrected_word\",\n  \"translation\": \"corrected_translation\",\n  \
         \"example\": \"natural_example_sentence_in_Finnish\",\n  \
         \"example_translation\": \"corrected_English_translation\",\n  \
         \"issues\": \"Explanation of what was wrong\"\n}}"
    )
}

/// Object-focused illustration prompt with optional topic context.
pub fn illustration_prompt(word: &str, topic: Option<&str>) -> String {
    let topic_context = match topic {
        Some(t) if !t.trim().is_empty() => format!(" in the '{}' category", t.trim()),
        _ => String::new(),
    };
    format!(
        "Create a visually engaging digital illustration of the Finnish word '{word}'{topic_context}. \
         {ILLUSTRATION_STYLE} \
         Do not include any text or captions in the image. \
         Focus on depicting the object or concept clearly, centrally positioned in the image, \
         with generous whitespace or a soft background around it. \
         The image should be a single, clean, minimalist illustration that clearly represents \
         the meaning of '{word}'. Use the soft, warm color palette and flat design style."
    )
}

/// Two-line (Finnish, then English) social caption for a topic.
pub fn caption_prompt(topic: &str) -> String {
    format!(
        "Create a short, engaging social media caption for a video about learning Finnish \
         vocabulary related to '{topic}'. The caption should be in both Finnish and English. \
         It should be fun, encouraging, and include appropriate emojis. \
         Format the output strictly as:\n\
         Finnish caption\n\
         English caption\n\n\
         Example:\n\
         Opi uusia sanoja säästä! ☀️🌧️\n\
         Learn new words about weather! ☀️🌧️"
    )
}

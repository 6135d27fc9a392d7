//! Agent instructions and per-turn prompt templates.

use crate::session::model::{HealthEntry, UserProfile};

/// System prompt bound to the wellness agent.
pub const AGENT_INSTRUCTIONS: &str = "\
You are Psychiatrist, an AI-powered assistant specializing in physical and mental wellness.
Your goal is to provide helpful advice and actionable recommendations to improve the user's well-being.
- For physical health queries, suggest exercises, nutrition tips, or general fitness advice.
- Ask the user questions about their health, step by step, to build the foundation for your analysis.
- For mental health queries, offer mindfulness techniques, stress management strategies, or relaxation exercises.
- If the query is unclear, ask clarifying questions to better understand the user's needs.
- Always respond in a supportive and empathetic tone.

Rules:
1. Reply in the same language as the user's query.
2. Keep responses between 50-100 words.
3. Prioritize actionable advice tailored to the user's specific data.
4. Maintain a supportive and empathetic tone.
5. At the end, list the possible reasons as bullet points.

Doctor consultation:
- Call the doctor if the user asks you to arrange a doctor consultation.
- Recommend a doctor for severe depression or anxiety symptoms, suicidal thoughts, \
complex mental health issues, cases requiring medication, or situations beyond AI assistance.
- Do not recommend a doctor for diet plan queries or personal health concerns that are not medical emergencies.
- To request a consultation, start your reply with exactly:
  [CALL_DOCTOR]{\"action\":\"call_doctor\",\"reason\":\"<why>\",\"urgency\":\"normal|urgent|emergency\",\"consultation_type\":\"<phone or video>\"}
  and then continue with your message to the user: explain why professional help is needed \
and keep supporting them while the consultation is arranged.";

/// Reasoning style appended to follow-up prompts.
pub const REASONING_GUIDELINES: &str = "\
Keep responses between 50-100 words and end with bullet points of possible reasons.
1. Exploration over conclusion: never rush to conclusions; question every assumption.
2. Depth of reasoning: break complex thoughts into simple, atomic steps and revise them when needed.
3. Thinking process: use short, simple sentences that mirror a doctor's natural thought patterns.";

/// Canned queries offered as one-click buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickQuery {
    StressRelief,
    SleepImprovement,
    DietSuggestions,
}

impl QuickQuery {
    pub const ALL: [QuickQuery; 3] = [
        QuickQuery::StressRelief,
        QuickQuery::SleepImprovement,
        QuickQuery::DietSuggestions,
    ];

    /// Button label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StressRelief => "Stress Relief Tips",
            Self::SleepImprovement => "Sleep Improvement",
            Self::DietSuggestions => "Diet Suggestions",
        }
    }

    /// The user message the button sends.
    pub fn message(&self) -> &'static str {
        match self {
            Self::StressRelief => {
                "Generate possible reasons that lead to stress, then ask me questions. \
                 When you are confident enough, give stress management techniques."
            }
            Self::SleepImprovement => "How to sleep better",
            Self::DietSuggestions => {
                "Ask questions about everything needed to calculate my BMI, then give me \
                 a proper diet plan that takes every aspect into account."
            }
        }
    }
}

impl std::str::FromStr for QuickQuery {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "stress_relief" | "stress" => Ok(Self::StressRelief),
            "sleep_improvement" | "sleep" => Ok(Self::SleepImprovement),
            "diet_suggestions" | "diet" => Ok(Self::DietSuggestions),
            other => Err(format!("unknown quick query '{other}'")),
        }
    }
}

/// Prompt for a message typed into the chat box.
pub fn chat_prompt(
    profile: &UserProfile,
    latest_health: Option<&HealthEntry>,
    language: &str,
    summary: &str,
    query: &str,
) -> String {
    let (weight, mood, sleep) = match latest_health {
        Some(entry) => (
            format!("{}kg", entry.weight_kg),
            format!("{} {}", entry.mood, entry.mood.emoji()),
            format!("{} hours", entry.sleep_hours),
        ),
        None => (
            "Not logged".to_string(),
            "Not logged".to_string(),
            "Not logged".to_string(),
        ),
    };

    format!(
        "User details:\n\
         - Name: {name}\n\
         - Age: {age}\n\
         - Ethnicity: {ethnicity}\n\
         - Give response in User language = {language}\n\
         - Always use name in generating the response\n\
         \n\
         Recent health data:\n\
         - Weight: {weight}\n\
         - Mood: {mood}\n\
         - Sleep: {sleep}\n\
         Last summary: {summary}\n\
         User query: {query}",
        name = profile.name,
        age = profile.age,
        ethnicity = profile.ethnicity_or_default(),
        summary = summary_or_none(summary),
    )
}

/// Prompt for replying to the latest user message after a quick query or a
/// document upload.
pub fn followup_prompt(
    profile: &UserProfile,
    language: &str,
    summary: &str,
    latest_user_message: &str,
) -> String {
    format!(
        "Generate the response in the user's language. User language: {language}. \
         My name is {name}, my age is {age} and my ethnicity is {ethnicity}. \
         Include my name in every response; do not repeat my age and ethnicity every time. \
         Keep in mind the last response summary: {summary}.\n\
         Use these instructions:\n{REASONING_GUIDELINES}\n\n\
         My message: {latest_user_message}",
        name = profile.name,
        age = profile.age,
        ethnicity = profile.ethnicity_or_default(),
        summary = summary_or_none(summary),
    )
}

/// Prompt asking for a short analysis of a freshly saved health entry.
pub fn health_check_prompt(profile: &UserProfile, entry: &HealthEntry) -> String {
    format!(
        "User details: name {name}, age {age}, ethnicity {ethnicity}\n\
         New health data: Weight {weight}kg, Mood {mood} {emoji}, Sleep {sleep} hours\n\
         Provide a brief analysis and recommendations.",
        name = profile.name,
        age = profile.age,
        ethnicity = profile.ethnicity_or_default(),
        weight = entry.weight_kg,
        mood = entry.mood,
        emoji = entry.mood.emoji(),
        sleep = entry.sleep_hours,
    )
}

fn summary_or_none(summary: &str) -> &str {
    if summary.trim().is_empty() {
        "None yet"
    } else {
        summary
    }
}

/// Limit `text` to `max_words` whitespace-separated words.
///
/// Texts within the limit are returned untouched; longer ones are re-joined
/// with single spaces and suffixed with `...`.
pub fn truncate_response(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > max_words {
        format!("{}...", words[..max_words].join(" "))
    } else {
        text.to_string()
    }
}

/// Number of words kept as the running conversation summary.
pub const SUMMARY_WORDS: usize = 60;

/// Running summary carried into the next prompt: the opening of the last reply.
pub fn summarize_reply(reply: &str) -> String {
    let words: Vec<&str> = reply.split_whitespace().collect();
    if words.len() > SUMMARY_WORDS {
        format!("{}...", words[..SUMMARY_WORDS].join(" "))
    } else {
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Local;

    use super::*;
    use crate::session::model::Mood;

    fn profile() -> UserProfile {
        UserProfile {
            name: "Priya".to_string(),
            age: 29,
            ethnicity: None,
        }
    }

    fn entry() -> HealthEntry {
        HealthEntry {
            timestamp: Local::now(),
            weight_kg: 61.5,
            mood: Mood::Low,
            sleep_hours: 5.0,
        }
    }

    #[test]
    fn instructions_describe_directive_format() {
        assert!(AGENT_INSTRUCTIONS.contains("[CALL_DOCTOR]{"));
        assert!(AGENT_INSTRUCTIONS.contains("\"urgency\""));
        assert!(AGENT_INSTRUCTIONS.contains("50-100 words"));
    }

    #[test]
    fn chat_prompt_without_health_data() {
        let prompt = chat_prompt(&profile(), None, "en", "", "I can't focus");
        assert!(prompt.contains("- Name: Priya"));
        assert!(prompt.contains("- Age: 29"));
        assert!(prompt.contains("- Ethnicity: Not provided"));
        assert!(prompt.contains("User language = en"));
        assert!(prompt.contains("- Weight: Not logged"));
        assert!(prompt.contains("Last summary: None yet"));
        assert!(prompt.ends_with("User query: I can't focus"));
    }

    #[test]
    fn chat_prompt_with_health_data_and_summary() {
        let prompt = chat_prompt(
            &profile(),
            Some(&entry()),
            "es",
            "Suggested a sleep routine",
            "¿Qué hago?",
        );
        assert!(prompt.contains("- Weight: 61.5kg"));
        assert!(prompt.contains("- Mood: low 😞"));
        assert!(prompt.contains("- Sleep: 5 hours"));
        assert!(prompt.contains("User language = es"));
        assert!(prompt.contains("Last summary: Suggested a sleep routine"));
    }

    #[test]
    fn followup_prompt_includes_guidelines_and_message() {
        let prompt = followup_prompt(&profile(), "fr", "", "How to sleep better");
        assert!(prompt.contains("User language: fr"));
        assert!(prompt.contains("My name is Priya"));
        assert!(prompt.contains("Exploration over conclusion"));
        assert!(prompt.ends_with("My message: How to sleep better"));
    }

    #[test]
    fn health_check_prompt_mentions_entry() {
        let prompt = health_check_prompt(&profile(), &entry());
        assert!(prompt.contains("Weight 61.5kg"));
        assert!(prompt.contains("Mood low"));
        assert!(prompt.contains("Sleep 5 hours"));
        assert!(prompt.contains("brief analysis"));
    }

    #[test]
    fn truncate_keeps_short_text_verbatim() {
        let text = "Line one.\n\nLine  two.";
        assert_eq!(truncate_response(text, 10), text);
    }

    #[test]
    fn truncate_cuts_long_text() {
        assert_eq!(truncate_response("a b c d e", 3), "a b c...");
        assert_eq!(truncate_response("a b c", 3), "a b c");
    }

    #[test]
    fn summary_is_bounded() {
        let long = "word ".repeat(100);
        let summary = summarize_reply(&long);
        assert_eq!(summary.split_whitespace().count(), SUMMARY_WORDS);
        assert!(summary.ends_with("..."));
        assert_eq!(summarize_reply("  short\nreply "), "short reply");
    }

    #[test]
    fn quick_query_parsing() {
        assert_eq!(
            "stress_relief".parse::<QuickQuery>().unwrap(),
            QuickQuery::StressRelief
        );
        assert_eq!("sleep".parse::<QuickQuery>().unwrap(), QuickQuery::SleepImprovement);
        assert_eq!(
            "diet-suggestions".parse::<QuickQuery>().unwrap(),
            QuickQuery::DietSuggestions
        );
        assert!("yoga".parse::<QuickQuery>().is_err());
        for query in QuickQuery::ALL {
            assert!(!query.message().is_empty());
            assert!(!query.label().is_empty());
        }
    }
}

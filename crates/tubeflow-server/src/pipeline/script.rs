//! Script formatting for production
//!
//! Fills in defaults for everything the model left out and numbers the
//! sections so the renderer can name per-section assets.

use chrono::Utc;

use super::framework::{
    FormattedScript, FormattedSection, Recommendation, ScriptMetadata, ScriptSection,
    VideoScript,
};

pub const DEFAULT_VIDEO_TITLE: &str = "Generated Video";
pub const DEFAULT_TOTAL_DURATION_SECS: f64 = 300.0;
pub const DEFAULT_VISUAL_PROMPT: &str = "Relevant background image";
pub const DEFAULT_SPEAKING_STYLE: &str = "conversational";

/// Format a script, replacing a section-less script with the default one
pub fn format_script(script: &VideoScript, section_duration_secs: f64) -> FormattedScript {
    let fallback;
    let script = if script.sections.is_empty() {
        fallback = default_script();
        &fallback
    } else {
        script
    };

    FormattedScript {
        metadata: ScriptMetadata {
            title: script
                .video_title
                .clone()
                .unwrap_or_else(|| DEFAULT_VIDEO_TITLE.to_string()),
            total_duration: script
                .total_duration_seconds
                .unwrap_or(DEFAULT_TOTAL_DURATION_SECS),
            created_at: Utc::now(),
        },
        sections: script
            .sections
            .iter()
            .enumerate()
            .map(|(i, section)| format_section(section, i + 1, section_duration_secs))
            .collect(),
        call_to_action: script.call_to_action.clone().unwrap_or_default(),
        hashtags: script.hashtags.clone(),
    }
}

fn format_section(section: &ScriptSection, number: usize, default_duration: f64) -> FormattedSection {
    FormattedSection {
        section_number: number,
        title: section
            .section_title
            .clone()
            .unwrap_or_else(|| format!("Section {number}")),
        content: section.content.clone().unwrap_or_default(),
        duration: section.duration_seconds.unwrap_or(default_duration),
        visual_prompt: section
            .visual_prompt
            .clone()
            .unwrap_or_else(|| DEFAULT_VISUAL_PROMPT.to_string()),
        speaking_style: section
            .speaking_style
            .clone()
            .unwrap_or_else(|| DEFAULT_SPEAKING_STYLE.to_string()),
        audio_file: format!("section_{number}.mp3"),
        image_file: format!("section_{number}.jpg"),
    }
}

fn section(title: &str, content: &str, duration: f64, visual: &str, style: &str) -> ScriptSection {
    ScriptSection {
        section_title: Some(title.to_string()),
        content: Some(content.to_string()),
        duration_seconds: Some(duration),
        visual_prompt: Some(visual.to_string()),
        speaking_style: Some(style.to_string()),
    }
}

/// Script used when the model returned no sections at all
pub fn default_script() -> VideoScript {
    VideoScript {
        video_title: Some("AI Generated Video".to_string()),
        sections: vec![
            section(
                "Introduction",
                "Welcome to this AI-generated video. Today we explore amazing topics.",
                30.0,
                "Abstract technology background",
                "energetic",
            ),
            section(
                "Main Content",
                "Here are the key points you need to know about this fascinating subject.",
                180.0,
                "Infographics and text overlays",
                "authoritative",
            ),
            section(
                "Conclusion",
                "Thank you for watching. Remember to apply what you learned today!",
                30.0,
                "Clean modern background",
                "friendly",
            ),
        ],
        total_duration_seconds: Some(240.0),
        call_to_action: Some("Like and subscribe for more!".to_string()),
        hashtags: vec!["#AI".into(), "#Content".into(), "#Education".into()],
    }
}

/// Script used when the model reply for a recommendation could not be parsed
pub fn fallback_script(recommendation: &Recommendation) -> VideoScript {
    VideoScript {
        video_title: Some(recommendation.target_title.clone()),
        sections: vec![
            section(
                "Introduction",
                "Welcome everyone! In today's video, we're diving deep into an exciting topic that's been trending lately.",
                30.0,
                "Host speaking to camera with engaging background",
                "energetic",
            ),
            section(
                "Main Content",
                "Let's break this down into three key points. First, the foundation. Second, the current applications. Third, future implications.",
                180.0,
                "Text overlays, graphics, and relevant footage",
                "authoritative",
            ),
            section(
                "Conclusion",
                "To wrap up, remember these key takeaways. Implement what you've learned and share your results in the comments!",
                60.0,
                "Host summarizing with key points on screen",
                "conversational",
            ),
        ],
        total_duration_seconds: Some(270.0),
        call_to_action: Some(
            "If you enjoyed this video, please like and subscribe for more content!".to_string(),
        ),
        hashtags: vec!["#education".into(), "#learning".into(), "#content".into()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let script = VideoScript {
            video_title: None,
            sections: vec![ScriptSection {
                content: Some("Hello".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let formatted = format_script(&script, 10.0);
        let first = &formatted.sections[0];

        assert_eq!(formatted.metadata.title, DEFAULT_VIDEO_TITLE);
        assert_eq!(formatted.metadata.total_duration, 300.0);
        assert_eq!(first.section_number, 1);
        assert_eq!(first.title, "Section 1");
        assert_eq!(first.duration, 10.0);
        assert_eq!(first.visual_prompt, DEFAULT_VISUAL_PROMPT);
        assert_eq!(first.speaking_style, DEFAULT_SPEAKING_STYLE);
        assert_eq!(first.audio_file, "section_1.mp3");
        assert_eq!(first.image_file, "section_1.jpg");
    }

    #[test]
    fn test_empty_script_uses_default_sections() {
        let formatted = format_script(&VideoScript::default(), 10.0);
        assert_eq!(formatted.sections.len(), 3);
        assert_eq!(formatted.metadata.title, "AI Generated Video");
        assert_eq!(formatted.sections[2].section_number, 3);
        assert_eq!(formatted.sections[2].image_file, "section_3.jpg");
    }

    #[test]
    fn test_model_values_are_kept() {
        let script = VideoScript {
            video_title: Some("Ship It".to_string()),
            sections: vec![ScriptSection {
                section_title: Some("Hook".to_string()),
                duration_seconds: Some(42.0),
                speaking_style: Some("curious".to_string()),
                ..Default::default()
            }],
            hashtags: vec!["#rust".to_string()],
            ..Default::default()
        };

        let formatted = format_script(&script, 10.0);
        assert_eq!(formatted.metadata.title, "Ship It");
        assert_eq!(formatted.sections[0].title, "Hook");
        assert_eq!(formatted.sections[0].duration, 42.0);
        assert_eq!(formatted.sections[0].speaking_style, "curious");
        assert_eq!(formatted.hashtags, vec!["#rust"]);
    }
}

//! Ollama-backed content strategist
//!
//! Talks to `/api/generate` with JSON output forced and temperature 0. The
//! model's reply is parsed leniently: JSON is cut out between the first `{`
//! and the last `}`, and anything unusable falls back to canned content
//! rather than failing the stage. Only transport errors fail.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write as _;
use std::time::Duration;
use tracing::{debug, warn};

use crate::pipeline::config::PipelineConfig;
use crate::pipeline::error::StageError;
use crate::pipeline::framework::{
    AnalysisSummary, ContentStrategist, EstimatedEngagement, Recommendation, VideoScript,
};
use crate::pipeline::script;

const STRATEGIST_SYSTEM_PROMPT: &str = r#"You are an expert YouTube content strategist.
Analyze the channel data and recommend the TOP 5 video topics that will maximize views and engagement.
Respond with valid JSON of this shape:
{
    "recommendations": [
        {
            "recommended_topic": "Specific video topic",
            "rationale": "Why this topic will perform well",
            "target_title": "Click-worthy title (under 60 characters)",
            "keywords": ["keyword1", "keyword2", "keyword3"],
            "content_structure": ["Hook (0-30s)", "Main point 1", "Main point 2", "Conclusion"],
            "estimated_duration": "X-Y minutes",
            "estimated_engagement": {"Expected views": "10k-20k", "Engagement rate": "5-8%"}
        }
    ]
}"#;

const SCRIPTWRITER_SYSTEM_PROMPT: &str = r##"You are a professional video scriptwriter. Write engaging, conversational YouTube scripts.
Use clear sections of one or two paragraphs each, with timing.
Respond with valid JSON of this shape:
{
    "video_title": "Final chosen title",
    "sections": [
        {
            "section_title": "Hook/Introduction",
            "content": "Full script text for this section",
            "duration_seconds": 30,
            "visual_prompt": "What should be shown on screen",
            "speaking_style": "energetic, curious, authoritative, etc."
        }
    ],
    "total_duration_seconds": 600,
    "call_to_action": "Subscribe and like the video",
    "hashtags": ["#hashtag1", "#hashtag2"]
}"##;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    system: &'a str,
    format: &'static str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Content strategist backed by a local Ollama server
pub struct OllamaStrategist {
    client: Client,
    host: String,
    model: String,
}

impl OllamaStrategist {
    pub fn new(
        host: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StageError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StageError::inference(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, StageError> {
        Self::new(&config.ollama_host, &config.llm_model, config.llm_timeout())
    }

    async fn generate(&self, system: &str, prompt: &str) -> Result<String, StageError> {
        let url = format!("{}/api/generate", self.host);
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            format: "json",
            stream: false,
            options: GenerateOptions { temperature: 0.0 },
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Ollama request");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| StageError::inference(format!("Ollama unreachable at {}: {e}", self.host)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StageError::inference(format!("Ollama returned {status}")));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| StageError::inference(format!("unexpected Ollama response: {e}")))?;

        Ok(body.response)
    }
}

#[async_trait]
impl ContentStrategist for OllamaStrategist {
    async fn recommend(&self, summary: &AnalysisSummary) -> Result<Vec<Recommendation>, StageError> {
        let prompt = recommendation_prompt(summary);
        let reply = self.generate(STRATEGIST_SYSTEM_PROMPT, &prompt).await?;

        Ok(parse_recommendations(&reply).unwrap_or_else(|| {
            warn!("Model reply held no usable recommendations, using fallback");
            vec![fallback_recommendation()]
        }))
    }

    async fn write_script(&self, recommendation: &Recommendation) -> Result<VideoScript, StageError> {
        let prompt = script_prompt(recommendation);
        let reply = self.generate(SCRIPTWRITER_SYSTEM_PROMPT, &prompt).await?;

        Ok(parse_script(&reply).unwrap_or_else(|| {
            warn!(title = %recommendation.target_title, "Model reply held no usable script, using fallback");
            script::fallback_script(recommendation)
        }))
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn recommendation_prompt(summary: &AnalysisSummary) -> String {
    let mut prompt = String::from(
        "Based on the following YouTube channel analysis, recommend the TOP 5 video topics:\n\n",
    );

    let _ = writeln!(prompt, "Channel: {}", summary.channel_name);
    let _ = writeln!(prompt, "Channel Metrics:");
    let _ = writeln!(prompt, "- Total Videos: {}", summary.total_videos);
    let _ = writeln!(prompt, "- Average Views: {:.0}", summary.avg_views);
    let _ = writeln!(prompt, "- Average Engagement Rate: {:.3}", summary.avg_engagement_rate);
    let _ = writeln!(
        prompt,
        "- Best Performing Video: {}",
        summary.best_video.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(prompt, "- Trending Topics: {}", summary.trending_topics.join(", "));

    if !summary.top_videos.is_empty() {
        let _ = writeln!(prompt, "\nMost engaging videos:");
        for video in &summary.top_videos {
            let _ = writeln!(prompt, "- {} ({:.2}%)", video.title, video.engagement_rate * 100.0);
        }
    }

    let _ = writeln!(prompt, "\nContent Analysis:");
    let _ = writeln!(
        prompt,
        "- Average Video Duration: {:.1} minutes",
        summary.avg_duration_secs / 60.0
    );

    let _ = writeln!(prompt, "\nTemporal Analysis:");
    let _ = writeln!(
        prompt,
        "- Best Day to Post: {}",
        summary.best_day.as_deref().unwrap_or("N/A")
    );
    let _ = writeln!(
        prompt,
        "- Best Hour to Post: {}",
        summary
            .best_hour
            .map_or_else(|| "N/A".to_string(), |hour| hour.to_string())
    );

    if !summary.competitors.is_empty() {
        let _ = writeln!(prompt, "\nCompetitor Analysis:");
        for competitor in &summary.competitors {
            let _ = writeln!(
                prompt,
                "- {}: Avg {:.0} views",
                competitor.title, competitor.avg_views
            );
        }
    }

    if !summary.initial_recommendations.is_empty() {
        let _ = writeln!(prompt, "\nInitial Recommendations:");
        for (i, suggestion) in summary.initial_recommendations.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, suggestion);
        }
    }

    prompt.push_str(
        "\nConsider what has performed well historically, current trends in the niche, \
         content gaps in the channel and engagement patterns. For each recommendation, \
         estimate engagement based on similar content.\n\
         Provide your recommendations in the specified JSON format.",
    );
    prompt
}

fn script_prompt(recommendation: &Recommendation) -> String {
    format!(
        "Create a complete video script based on this recommendation:\n\n\
         Topic: {}\nTitle: {}\nStructure: {:?}\nDuration: {}\n\n\
         Make it engaging, informative and suitable for YouTube. \
         Include a hook, the main content and a call to action.",
        recommendation.recommended_topic,
        recommendation.target_title,
        recommendation.content_structure,
        recommendation.estimated_duration,
    )
}

// ============================================================================
// Reply Parsing
// ============================================================================

/// The text between the first `{` and the last `}`, inclusive
pub fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Recommendations from a model reply, `None` when there are none usable
pub fn parse_recommendations(reply: &str) -> Option<Vec<Recommendation>> {
    let value: Value = serde_json::from_str(extract_json(reply)?).ok()?;
    let recommendations: Vec<Recommendation> = value
        .get("recommendations")?
        .as_array()?
        .iter()
        .filter_map(recommendation_from_value)
        .collect();

    (!recommendations.is_empty()).then_some(recommendations)
}

/// A script from a model reply, `None` when the JSON does not fit
pub fn parse_script(reply: &str) -> Option<VideoScript> {
    serde_json::from_str(extract_json(reply)?).ok()
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

fn text_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| text(Some(item)))
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn recommendation_from_value(value: &Value) -> Option<Recommendation> {
    let obj = value.as_object()?;

    let mut target_title = text(obj.get("target_title"));
    let mut recommended_topic = text(obj.get("recommended_topic"));
    match (target_title.is_empty(), recommended_topic.is_empty()) {
        (true, true) => return None,
        (true, false) => target_title.clone_from(&recommended_topic),
        (false, true) => recommended_topic.clone_from(&target_title),
        (false, false) => {}
    }

    let rationale = text(obj.get("rationale"));

    Some(Recommendation {
        target_title,
        recommended_topic,
        estimated_duration: text(obj.get("estimated_duration")),
        estimated_engagement: obj
            .get("estimated_engagement")
            .map(parse_engagement)
            .unwrap_or_default(),
        rationale: (!rationale.is_empty()).then_some(rationale),
        keywords: text_list(obj.get("keywords")),
        content_structure: text_list(obj.get("content_structure")),
    })
}

/// Engagement estimate given either as an object or as
/// `"Expected views: X, Engagement rate: Y"`
fn parse_engagement(value: &Value) -> EstimatedEngagement {
    match value {
        Value::Object(map) => EstimatedEngagement {
            expected_views: text(map.get("Expected views").or_else(|| map.get("expected_views"))),
            engagement_rate: text(map.get("Engagement rate").or_else(|| map.get("engagement_rate"))),
        },
        Value::String(s) => {
            let mut estimate = EstimatedEngagement::default();
            for part in s.split(',') {
                let Some((key, val)) = part.split_once(':') else {
                    continue;
                };
                match key.trim().to_ascii_lowercase().as_str() {
                    "expected views" => estimate.expected_views = val.trim().to_string(),
                    "engagement rate" => estimate.engagement_rate = val.trim().to_string(),
                    _ => {}
                }
            }
            estimate
        }
        _ => EstimatedEngagement::default(),
    }
}

/// The single recommendation used when the model reply is unusable
pub fn fallback_recommendation() -> Recommendation {
    Recommendation {
        target_title: "Top Trends You Need to Know".to_string(),
        recommended_topic: "Industry Trends Analysis".to_string(),
        estimated_duration: "8-10 minutes".to_string(),
        estimated_engagement: EstimatedEngagement {
            expected_views: "5k-10k".to_string(),
            engagement_rate: "3-5%".to_string(),
        },
        rationale: Some(
            "Based on your channel's performance with educational content".to_string(),
        ),
        keywords: vec!["trends".into(), "analysis".into(), "industry".into()],
        content_structure: vec![
            "Introduction".into(),
            "Trend 1".into(),
            "Trend 2".into(),
            "Trend 3".into(),
            "Conclusion".into(),
        ],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::pipeline::framework::CompetitorSummary;

    #[test]
    fn test_extract_json_strips_chatter() {
        assert_eq!(extract_json("Sure! {\"a\": {\"b\": 1}} hope it helps"), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("} backwards {"), None);
    }

    #[test]
    fn test_parse_recommendations_object_engagement() {
        let reply = r#"{"recommendations": [{
            "target_title": "Rust in 100 Seconds",
            "recommended_topic": "Rust basics",
            "estimated_duration": "2 minutes",
            "estimated_engagement": {"Expected views": "10k-20k", "Engagement rate": "5-8%"},
            "keywords": ["rust", "systems"]
        }]}"#;

        let recs = parse_recommendations(reply).unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].target_title, "Rust in 100 Seconds");
        assert_eq!(recs[0].estimated_engagement.expected_views, "10k-20k");
        assert_eq!(recs[0].estimated_engagement.engagement_rate, "5-8%");
        assert_eq!(recs[0].keywords, vec!["rust", "systems"]);
        assert!(recs[0].rationale.is_none());
    }

    #[test]
    fn test_parse_engagement_string_form() {
        let estimate = parse_engagement(&Value::String(
            "Expected views: 5k-10k, Engagement rate: 3-5%".to_string(),
        ));
        assert_eq!(estimate.expected_views, "5k-10k");
        assert_eq!(estimate.engagement_rate, "3-5%");
    }

    #[test]
    fn test_parse_recommendations_rejects_garbage() {
        assert!(parse_recommendations("Unable to generate recommendation").is_none());
        assert!(parse_recommendations(r#"{"recommendations": []}"#).is_none());
        assert!(parse_recommendations(r#"{"recommendations": [{"keywords": []}]}"#).is_none());
    }

    #[test]
    fn test_missing_title_borrows_topic() {
        let recs =
            parse_recommendations(r#"{"recommendations": [{"recommended_topic": "Borrow checker"}]}"#)
                .unwrap();
        assert_eq!(recs[0].target_title, "Borrow checker");
    }

    #[test]
    fn test_parse_script() {
        let script = parse_script(
            r#"Here you go: {"video_title": "T", "sections": [{"section_title": "Hook", "duration_seconds": 12}]}"#,
        )
        .unwrap();
        assert_eq!(script.video_title.as_deref(), Some("T"));
        assert_eq!(script.sections[0].duration_seconds, Some(12.0));
        assert!(parse_script("nothing").is_none());
    }

    #[test]
    fn test_recommendation_prompt_mentions_metrics() {
        let summary = AnalysisSummary {
            channel_name: "Crab".to_string(),
            total_videos: 3,
            avg_views: 1500.4,
            avg_engagement_rate: 0.0421,
            trending_topics: vec!["rust".to_string(), "async".to_string()],
            avg_duration_secs: 300.0,
            ..Default::default()
        };
        let prompt = recommendation_prompt(&summary);
        assert!(prompt.contains("Total Videos: 3"));
        assert!(prompt.contains("Average Views: 1500"));
        assert!(prompt.contains("Best Performing Video: N/A"));
        assert!(prompt.contains("rust, async"));
        assert!(prompt.contains("Average Video Duration: 5.0 minutes"));
        assert!(prompt.contains("Best Day to Post: N/A"));
        assert!(prompt.contains("Best Hour to Post: N/A"));
        assert!(!prompt.contains("Competitor Analysis"));
        assert!(!prompt.contains("Initial Recommendations"));
    }

    #[test]
    fn test_recommendation_prompt_with_timing_and_competitors() {
        let summary = AnalysisSummary {
            channel_name: "Crab".to_string(),
            avg_duration_secs: 630.0,
            best_day: Some("Tuesday".to_string()),
            best_hour: Some(0),
            competitors: vec![CompetitorSummary {
                channel_id: "UCk".to_string(),
                title: "Ferris Talks".to_string(),
                avg_views: 12_345.6,
                avg_engagement_rate: 0.05,
                video_count: 20,
                best_video: None,
            }],
            initial_recommendations: vec![
                "Publish on Tuesday at 0:00 for better engagement".to_string(),
                "Create more videos like 'Ownership' (high performance)".to_string(),
            ],
            ..Default::default()
        };
        let prompt = recommendation_prompt(&summary);
        assert!(prompt.contains("Average Video Duration: 10.5 minutes"));
        assert!(prompt.contains("Best Day to Post: Tuesday"));
        assert!(prompt.contains("Best Hour to Post: 0"));
        assert!(prompt.contains("Competitor Analysis:\n- Ferris Talks: Avg 12346 views"));
        assert!(prompt.contains(
            "Initial Recommendations:\n\
             1. Publish on Tuesday at 0:00 for better engagement\n\
             2. Create more videos like 'Ownership' (high performance)"
        ));
    }

    #[test]
    fn test_system_prompts_are_complete_json_examples() {
        assert!(SCRIPTWRITER_SYSTEM_PROMPT.contains(r##""hashtags": ["#hashtag1", "#hashtag2"]"##));
        assert!(SCRIPTWRITER_SYSTEM_PROMPT.ends_with('}'));
        assert!(STRATEGIST_SYSTEM_PROMPT.ends_with('}'));

        let example = extract_json(SCRIPTWRITER_SYSTEM_PROMPT).unwrap();
        let value: Value = serde_json::from_str(example).unwrap();
        assert_eq!(value["hashtags"][1], "#hashtag2");
    }
}

//! Prompt Catalog
//!
//! The canned prompt suggestions shown when the conversation is empty.
//! Pure data - never mutated at runtime.

/// A canned prompt suggestion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PromptSuggestion {
    /// Short display name
    pub name: &'static str,
    /// What the assistant will do with it
    pub description: &'static str,
}

impl PromptSuggestion {
    /// The draft text a selected suggestion expands to
    #[must_use]
    pub fn draft_text(&self) -> String {
        format!("{} : {}", self.name, self.description)
    }
}

/// The suggestion list for the social media content assistant
pub const SUGGESTIONS: &[PromptSuggestion] = &[
    PromptSuggestion {
        name: "Trending Topics Assistant",
        description: "Generate content based on current events, trending hashtags, and popular conversations relevant to the user's industry or interests.",
    },
    PromptSuggestion {
        name: "Brand Voice Tailor",
        description: "Craft posts that align with the user's established brand voice and messaging guidelines, ensuring consistency across all social media channels.",
    },
    PromptSuggestion {
        name: "Interactive Content Creator",
        description: "Develop polls, quizzes, and interactive stories to engage with the user's audience and encourage participation.",
    },
    PromptSuggestion {
        name: "User-Generated Content Aggregator",
        description: "Curate and repurpose user-generated content that mentions or tags the user's brand, giving credit to the original creators.",
    },
    PromptSuggestion {
        name: "Visual Content Designer",
        description: "Assist in creating visually appealing graphics, photos, and videos tailored to the aesthetics of different social platforms.",
    },
    PromptSuggestion {
        name: "Hashtag Strategy Developer",
        description: "Generate effective hashtags for posts to increase reach and engagement, customized for specific campaigns or general brand awareness.",
    },
    PromptSuggestion {
        name: "Content Calendar Organizer",
        description: "Help plan and schedule posts with a content calendar that organizes themes, promotional cycles, and post timing for optimal engagement.",
    },
    PromptSuggestion {
        name: "Engagement Booster",
        description: "Suggest content that prompts user interaction, such as questions, call-to-actions, or content that sparks discussion and community-building.",
    },
    PromptSuggestion {
        name: "Analytics Reporter",
        description: "Summarize key metrics and insights from social media analytics to refine content strategy and identify successful types of posts.",
    },
    PromptSuggestion {
        name: "Campaign Kick-starter",
        description: "Assist in developing content for new product launches, events, or campaigns with a focused message and call-to-action.",
    },
    PromptSuggestion {
        name: "Influencer Collaboration Facilitator",
        description: "Generate ideas and outreach templates for collaborating with influencers and thought leaders in the user's niche.",
    },
    PromptSuggestion {
        name: "Crisis Communication Aide",
        description: "Offer templates and advice on how to handle sensitive issues or crises that arise on social media professionally and tactfully.",
    },
    PromptSuggestion {
        name: "Competitor Content Analyzer",
        description: "Gain insight by summarizing what competitors are posting, analyzing their engagement rates, and noting successful content strategies.",
    },
    PromptSuggestion {
        name: "SEO Content Enhancer",
        description: "Incorporate trending keywords and SEO best practices into social media content to improve visibility in social searches.",
    },
    PromptSuggestion {
        name: "Localization Specialist",
        description: "Adapt content for global audiences by considering cultural relevance and language preferences for different regions.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_nonempty() {
        assert_eq!(SUGGESTIONS.len(), 15);
    }

    #[test]
    fn test_draft_text_format() {
        let suggestion = SUGGESTIONS
            .iter()
            .find(|s| s.name == "SEO Content Enhancer")
            .unwrap();
        let draft = suggestion.draft_text();
        assert!(draft.starts_with("SEO Content Enhancer : "));
        assert!(draft.ends_with(suggestion.description));
    }
}

use once_cell::sync::Lazy;
use serde::Serialize;
use vader_sentiment::SentimentIntensityAnalyzer;

const POSITIVE_THRESHOLD: f64 = 0.1;
const NEGATIVE_THRESHOLD: f64 = -0.1;

static ANALYZER: Lazy<SentimentIntensityAnalyzer<'static>> =
    Lazy::new(SentimentIntensityAnalyzer::new);

/// Scores the polarity of a text as a single compound value in [-1, 1].
pub trait SentimentScorer {
    fn compound(&self, text: &str) -> f64;
}

/// Lexicon and rule based scoring (VADER), tuned for social media text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Vader;

impl SentimentScorer for Vader {
    fn compound(&self, text: &str) -> f64 {
        ANALYZER
            .polarity_scores(text)
            .get("compound")
            .copied()
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Both thresholds are inclusive.
    pub fn classify(compound: f64) -> Self {
        if compound >= POSITIVE_THRESHOLD {
            Sentiment::Positive
        } else if compound <= NEGATIVE_THRESHOLD {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SentimentCounts {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

impl SentimentCounts {
    pub fn tally<'a, S, I>(scorer: &S, texts: I) -> Self
    where
        S: SentimentScorer + ?Sized,
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = Self::default();
        for text in texts {
            match Sentiment::classify(scorer.compound(text)) {
                Sentiment::Positive => counts.positive += 1,
                Sentiment::Neutral => counts.neutral += 1,
                Sentiment::Negative => counts.negative += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.positive + self.neutral + self.negative
    }
}

// Fuzzy matching between the official list and the observed names.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JSValue};
use snafu::Snafu;

use crate::config::Sensitivity;
use crate::normalize::{self, is_arabic, similarity, skeleton, strip_titles};

/// What the matching capability receives.
#[derive(Debug, Clone, Copy)]
pub struct MatchRequest<'a> {
    pub official: &'a [String],
    pub observed: &'a [String],
    pub sensitivity: Sensitivity,
}

impl<'a> MatchRequest<'a> {
    pub fn new(
        official: &'a [String],
        observed: &'a [String],
        sensitivity: Sensitivity,
    ) -> MatchRequest<'a> {
        MatchRequest {
            official,
            observed,
            sensitivity,
        }
    }

    pub fn instruction(&self) -> &'static str {
        self.sensitivity.instruction()
    }

    /// The full text prompt for a language-model backed matcher.
    pub fn prompt(&self) -> String {
        format!(
            "Compare List A (Official) with List B (Session participants).\n\
             Sensitivity: {}\n\n\
             List A (Official):\n{}\n\n\
             List B (Session participants):\n{}\n\n\
             Return a JSON object:\n\
             {{\n  \"present\": [{{\"name\": \"Name from List A\", \"originalName\": \"Matched from List B\"}}],\n  \
             \"absent\": [\"Names from List A not found\"],\n  \
             \"unexpected\": [\"Names in List B not in List A\"]\n}}\n",
            self.instruction(),
            self.official.join("\n"),
            self.observed.join("\n")
        )
    }
}

/// The structured output schema expected from the matching capability.
pub fn response_schema() -> JSValue {
    json!({
        "type": "object",
        "properties": {
            "present": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "originalName": { "type": "string" }
                    },
                    "required": ["name", "originalName"]
                }
            },
            "absent": { "type": "array", "items": { "type": "string" } },
            "unexpected": { "type": "array", "items": { "type": "string" } }
        },
        "required": ["present", "absent", "unexpected"]
    })
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPair {
    pub name: String,
    #[serde(rename = "originalName")]
    pub original_name: String,
}

/// The answer of the matching capability.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchResponse {
    pub present: Vec<MatchedPair>,
    pub absent: Vec<String>,
    pub unexpected: Vec<String>,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub), display("Matching failed: {message}"))]
pub struct MatchFailure {
    pub message: String,
}

/// A capability that reconciles the two name lists.
///
/// The answer is the JSON text of a [`MatchResponse`]. It is not trusted and
/// gets parsed and checked by the engine.
pub trait NameMatcher {
    fn match_names(&self, request: &MatchRequest) -> Result<String, MatchFailure>;
}

/// Parses the answer of a matching capability.
///
/// Language models like to wrap JSON in markdown fences; those are removed.
pub fn parse_match_response(text: &str) -> Result<MatchResponse, serde_json::Error> {
    let mut body = text.trim();
    if body.starts_with("```") {
        body = body.trim_start_matches("```json").trim_start_matches("```");
        body = body.trim_end_matches("```");
    }
    serde_json::from_str(body.trim())
}

// A name prepared for comparison.
#[derive(Debug, Clone)]
struct NameForm {
    full: String,
    tokens: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Thresholds {
    whole: f64,
    token: f64,
    // Partial names ("Sara" for "Sara Ali") are accepted.
    partial: bool,
    cross_lingual: bool,
    strip_titles: bool,
}

impl Thresholds {
    fn of(sensitivity: Sensitivity) -> Thresholds {
        match sensitivity {
            Sensitivity::Strict => Thresholds {
                whole: 0.9,
                token: 1.0,
                partial: false,
                cross_lingual: false,
                strip_titles: false,
            },
            Sensitivity::Balanced => Thresholds {
                whole: 0.85,
                token: 0.8,
                partial: false,
                cross_lingual: true,
                strip_titles: true,
            },
            Sensitivity::Flexible => Thresholds {
                whole: 0.7,
                token: 0.7,
                partial: true,
                cross_lingual: true,
                strip_titles: true,
            },
        }
    }
}

// Score given to an initial ("A.") matching the first letter of a token.
const INITIAL_SCORE: f64 = 0.85;
// Token-wise matches rank below whole-name matches of the same quality.
const ALIGNMENT_WEIGHT: f64 = 0.95;
const SHARED_TOKEN_WEIGHT: f64 = 0.7;

/// A local matcher based on edit distance, title stripping and a
/// consonant skeleton that bridges Arabic and Latin spellings.
///
/// Pairs are assigned one-to-one, best score first. Ties go to the earlier
/// official name, then to the earlier observed name.
#[derive(Debug, Clone)]
pub struct FuzzyMatcher {
    titles: Vec<String>,
}

impl Default for FuzzyMatcher {
    fn default() -> FuzzyMatcher {
        FuzzyMatcher {
            titles: normalize::DEFAULT_TITLES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FuzzyMatcher {
    pub fn with_titles(titles: &[String]) -> FuzzyMatcher {
        FuzzyMatcher {
            titles: titles.iter().map(|t| normalize::normalize_name(t)).collect(),
        }
    }

    fn prepare(&self, name: &str, th: &Thresholds) -> NameForm {
        let toks = normalize::tokens(name);
        let tokens = if th.strip_titles {
            strip_titles(&toks, &self.titles)
        } else {
            toks
        };
        NameForm {
            full: tokens.join(" "),
            tokens,
        }
    }

    /// Reconciles the two lists directly.
    pub fn reconcile(
        &self,
        official: &[String],
        observed: &[String],
        sensitivity: Sensitivity,
    ) -> MatchResponse {
        let th = Thresholds::of(sensitivity);
        let official = unique(official);
        let observed = unique(observed);
        let off_forms: Vec<NameForm> = official.iter().map(|n| self.prepare(n, &th)).collect();
        let obs_forms: Vec<NameForm> = observed.iter().map(|n| self.prepare(n, &th)).collect();

        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (oi, a) in off_forms.iter().enumerate() {
            for (bi, b) in obs_forms.iter().enumerate() {
                // Punctuation only: nothing to compare.
                if a.tokens.is_empty() || b.tokens.is_empty() {
                    continue;
                }
                if let Some(score) = score_pair(a, b, &th) {
                    candidates.push((score, oi, bi));
                }
            }
        }
        candidates.sort_by(|x, y| {
            y.0.partial_cmp(&x.0)
                .unwrap_or(Ordering::Equal)
                .then(x.1.cmp(&y.1))
                .then(x.2.cmp(&y.2))
        });

        let mut assigned: HashMap<usize, usize> = HashMap::new();
        let mut taken: HashSet<usize> = HashSet::new();
        for (score, oi, bi) in candidates {
            if assigned.contains_key(&oi) || taken.contains(&bi) {
                continue;
            }
            debug!(
                "reconcile: {:?} ~ {:?} (score {:.3})",
                official[oi], observed[bi], score
            );
            assigned.insert(oi, bi);
            taken.insert(bi);
        }

        let mut res = MatchResponse::default();
        for (oi, name) in official.iter().enumerate() {
            match assigned.get(&oi) {
                Some(bi) => res.present.push(MatchedPair {
                    name: name.clone(),
                    original_name: observed[*bi].clone(),
                }),
                None => res.absent.push(name.clone()),
            }
        }
        for (bi, name) in observed.iter().enumerate() {
            if !taken.contains(&bi) {
                res.unexpected.push(name.clone());
            }
        }
        res
    }
}

impl NameMatcher for FuzzyMatcher {
    fn match_names(&self, request: &MatchRequest) -> Result<String, MatchFailure> {
        let res = self.reconcile(request.official, request.observed, request.sensitivity);
        serde_json::to_string(&res).map_err(|e| MatchFailure {
            message: e.to_string(),
        })
    }
}

fn unique(names: &[String]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    names
        .iter()
        .filter(|n| !n.trim().is_empty() && seen.insert(n.as_str()))
        .cloned()
        .collect()
}

fn token_similarity(a: &str, b: &str, th: &Thresholds, min_skeleton: usize) -> f64 {
    if a == b {
        return 1.0;
    }
    let s = similarity(a, b);
    // Skeletons only bridge scripts: within one script, "mohamed" and
    // "mahmoud" share one and are different names.
    if th.cross_lingual && is_arabic(a) != is_arabic(b) {
        let (sa, sb) = (skeleton(a), skeleton(b));
        if sa.len() >= min_skeleton && sa == sb {
            return s.max(0.9);
        }
    }
    s
}

fn is_initial_of(initial: &str, token: &str) -> bool {
    initial.chars().count() == 1 && token.chars().next() == initial.chars().next()
}

// Every token of `short` must find its own token in `long`, the first
// tokens being matched together. Returns the mean token score.
fn align(short: &[String], long: &[String], th: &Thresholds) -> Option<f64> {
    let (first_s, rest_s) = short.split_first()?;
    let (first_l, rest_l) = long.split_first()?;
    let first = token_similarity(first_s, first_l, th, 2);
    if first < th.token {
        return None;
    }
    let mut total = first;
    let mut used: Vec<bool> = vec![false; rest_l.len()];
    for tok in rest_s {
        let mut best: Option<(usize, f64)> = None;
        for (idx, other) in rest_l.iter().enumerate() {
            if used[idx] {
                continue;
            }
            let s = if is_initial_of(tok, other) || is_initial_of(other, tok) {
                INITIAL_SCORE
            } else {
                token_similarity(tok, other, th, 1)
            };
            if s >= th.token && best.map(|(_, b)| s > b).unwrap_or(true) {
                best = Some((idx, s));
            }
        }
        let (idx, s) = best?;
        used[idx] = true;
        total += s;
    }
    Some(total / short.len() as f64)
}

fn keep_best(best: &mut Option<f64>, s: f64) {
    if best.map(|b| s > b).unwrap_or(true) {
        *best = Some(s);
    }
}

fn score_pair(a: &NameForm, b: &NameForm, th: &Thresholds) -> Option<f64> {
    let mut best: Option<f64> = None;

    let whole = similarity(&a.full, &b.full);
    if whole >= th.whole {
        keep_best(&mut best, whole);
    }
    if th.token >= 1.0 {
        return best;
    }

    let (short, long) = if a.tokens.len() <= b.tokens.len() {
        (&a.tokens, &b.tokens)
    } else {
        (&b.tokens, &a.tokens)
    };
    let partial_ok = th.partial || short.len() >= 2 || long.len() == 1;
    if partial_ok {
        if let Some(s) = align(short, long, th) {
            keep_best(&mut best, s * ALIGNMENT_WEIGHT);
        }
        if short.len() == long.len() {
            if let Some(s) = align(long, short, th) {
                keep_best(&mut best, s * ALIGNMENT_WEIGHT);
            }
        }
    }

    if th.partial {
        for x in a.tokens.iter().filter(|t| t.chars().count() >= 3) {
            for y in b.tokens.iter().filter(|t| t.chars().count() >= 3) {
                let s = token_similarity(x, y, th, 2);
                if s >= 0.75 {
                    keep_best(&mut best, s * SHARED_TOKEN_WEIGHT);
                }
            }
        }
    }
    best
}

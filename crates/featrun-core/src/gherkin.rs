//! Line-oriented parser for the Gherkin subset used by declarative API suites.
//!
//! Recognised: `Feature:`, `Background:`, `Scenario:` / `Example:`,
//! `Scenario Outline:` / `Scenario Template:`, `Examples:` / `Scenarios:`,
//! tag lines, step lines, doc strings, table rows and comments. Everything
//! else is treated as free-form description.

use std::collections::BTreeSet;
use std::path::Path;

use crate::domain::{Scenario, ScenarioId, ScenarioKind, Spec, Step, Tag};
use crate::error::DiscoveryError;

const STEP_KEYWORDS: &[&str] = &["Given", "When", "Then", "And", "But", "*"];

struct ScenarioDraft {
    line: usize,
    name: String,
    outline: bool,
    tags: BTreeSet<Tag>,
    steps: Vec<Step>,
    example_rows: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    /// Between the `Feature:` header and the first block.
    Header,
    Background,
    Scenario,
    /// Inside an `Examples:` block; `true` until its header row is read.
    Examples { awaiting_header: bool },
}

struct Parser<'a> {
    path: &'a Path,
    feature: Option<(String, BTreeSet<Tag>)>,
    background: Vec<Step>,
    scenarios: Vec<ScenarioDraft>,
    pending_tags: BTreeSet<Tag>,
    section: Section,
    doc_string: Option<(&'static str, usize)>,
}

/// Parse a feature file into a [`Spec`].
pub fn parse_feature(path: &Path, source: &str) -> Result<Spec, DiscoveryError> {
    let mut parser = Parser {
        path,
        feature: None,
        background: Vec::new(),
        scenarios: Vec::new(),
        pending_tags: BTreeSet::new(),
        section: Section::Header,
        doc_string: None,
    };
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    for (idx, raw) in source.lines().enumerate() {
        parser.line(idx + 1, raw)?;
    }
    parser.finish()
}

impl<'a> Parser<'a> {
    fn error(&self, line: usize, message: impl Into<String>) -> DiscoveryError {
        DiscoveryError::Parse {
            path: self.path.to_path_buf(),
            line,
            message: message.into(),
        }
    }

    fn line(&mut self, line: usize, raw: &str) -> Result<(), DiscoveryError> {
        let trimmed = raw.trim();

        if let Some((delimiter, _)) = self.doc_string {
            if trimmed.starts_with(delimiter) {
                self.doc_string = None;
            } else if let Some(step) = self.last_step_mut() {
                step.attachment.push(raw.to_string());
            }
            return Ok(());
        }

        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(());
        }

        if let Some(delimiter) = ["\"\"\"", "```"].into_iter().find(|d| trimmed.starts_with(d)) {
            if self.last_step_mut().is_none() {
                return Err(self.error(line, "doc string without a preceding step"));
            }
            self.doc_string = Some((delimiter, line));
            return Ok(());
        }

        if trimmed.starts_with('@') {
            return self.tag_line(line, trimmed);
        }

        if trimmed.starts_with('|') {
            return self.table_row(line, trimmed);
        }

        if let Some((keyword, rest)) = trimmed.split_once(':') {
            let name = rest.trim().to_string();
            match keyword.trim() {
                "Feature" => return self.feature(line, name),
                "Background" => return self.background(line),
                "Scenario" | "Example" => return self.scenario(line, name, false),
                "Scenario Outline" | "Scenario Template" => return self.scenario(line, name, true),
                "Examples" | "Scenarios" => return self.examples(line),
                _ => {}
            }
        }

        if let Some(step) = parse_step(line, trimmed) {
            return self.step(line, step);
        }

        if self.feature.is_none() {
            return Err(self.error(line, "expected Feature: header"));
        }
        // Free-form description.
        Ok(())
    }

    fn tag_line(&mut self, line: usize, trimmed: &str) -> Result<(), DiscoveryError> {
        for token in trimmed.split_whitespace() {
            if token.starts_with('#') {
                break;
            }
            let tag = Tag::from_token(token).map_err(|e| self.error(line, e.to_string()))?;
            self.pending_tags.insert(tag);
        }
        Ok(())
    }

    fn table_row(&mut self, line: usize, trimmed: &str) -> Result<(), DiscoveryError> {
        if let Section::Examples { awaiting_header } = self.section {
            if awaiting_header {
                self.section = Section::Examples {
                    awaiting_header: false,
                };
            } else if let Some(draft) = self.scenarios.last_mut() {
                draft.example_rows += 1;
            }
            return Ok(());
        }
        match self.last_step_mut() {
            Some(step) => {
                step.attachment.push(trimmed.to_string());
                Ok(())
            }
            None => Err(self.error(line, "table row without a preceding step")),
        }
    }

    fn feature(&mut self, line: usize, name: String) -> Result<(), DiscoveryError> {
        if self.feature.is_some() {
            return Err(self.error(line, "more than one Feature: header"));
        }
        let tags = std::mem::take(&mut self.pending_tags);
        self.feature = Some((name, tags));
        self.section = Section::Header;
        Ok(())
    }

    fn background(&mut self, line: usize) -> Result<(), DiscoveryError> {
        self.require_feature(line, "Background:")?;
        if !self.scenarios.is_empty() {
            return Err(self.error(line, "Background: must precede all scenarios"));
        }
        self.pending_tags.clear();
        self.section = Section::Background;
        Ok(())
    }

    fn scenario(&mut self, line: usize, name: String, outline: bool) -> Result<(), DiscoveryError> {
        self.require_feature(line, "Scenario:")?;
        let tags = std::mem::take(&mut self.pending_tags);
        self.scenarios.push(ScenarioDraft {
            line,
            name,
            outline,
            tags,
            steps: Vec::new(),
            example_rows: 0,
        });
        self.section = Section::Scenario;
        Ok(())
    }

    fn examples(&mut self, line: usize) -> Result<(), DiscoveryError> {
        let tags = std::mem::take(&mut self.pending_tags);
        let Some(draft) = self.scenarios.last_mut().filter(|d| d.outline) else {
            return Err(self.error(line, "Examples: outside a Scenario Outline"));
        };
        draft.tags.extend(tags);
        self.section = Section::Examples {
            awaiting_header: true,
        };
        Ok(())
    }

    fn step(&mut self, line: usize, step: Step) -> Result<(), DiscoveryError> {
        match self.section {
            Section::Background => {
                self.background.push(step);
                Ok(())
            }
            Section::Scenario => match self.scenarios.last_mut() {
                Some(draft) => {
                    draft.steps.push(step);
                    Ok(())
                }
                None => Err(self.error(line, "step outside a scenario")),
            },
            Section::Examples { .. } => Err(self.error(line, "step inside Examples:")),
            Section::Header if self.feature.is_none() => {
                Err(self.error(line, "step before Feature: header"))
            }
            Section::Header => Err(self.error(line, "step outside a scenario")),
        }
    }

    fn require_feature(&self, line: usize, what: &str) -> Result<(), DiscoveryError> {
        if self.feature.is_none() {
            return Err(self.error(line, format!("{} before Feature: header", what)));
        }
        Ok(())
    }

    fn last_step_mut(&mut self) -> Option<&mut Step> {
        match self.section {
            Section::Background => self.background.last_mut(),
            Section::Scenario => self.scenarios.last_mut().and_then(|d| d.steps.last_mut()),
            Section::Header | Section::Examples { .. } => None,
        }
    }

    fn finish(self) -> Result<Spec, DiscoveryError> {
        if let Some((_, line)) = self.doc_string {
            return Err(self.error(line, "unterminated doc string"));
        }
        let Some((feature, feature_tags)) = self.feature else {
            return Err(DiscoveryError::Parse {
                path: self.path.to_path_buf(),
                line: 1,
                message: "missing Feature: header".to_string(),
            });
        };

        let scenarios = self
            .scenarios
            .into_iter()
            .map(|draft| {
                let mut tags = feature_tags.clone();
                tags.extend(draft.tags);
                Scenario {
                    id: ScenarioId::new(self.path, draft.line),
                    name: draft.name,
                    kind: if draft.outline {
                        ScenarioKind::Outline {
                            examples: draft.example_rows,
                        }
                    } else {
                        ScenarioKind::Scenario
                    },
                    tags,
                    background: self.background.clone(),
                    steps: draft.steps,
                }
            })
            .collect();

        Ok(Spec {
            path: self.path.to_path_buf(),
            feature,
            tags: feature_tags,
            background: self.background,
            scenarios,
        })
    }
}

fn parse_step(line: usize, trimmed: &str) -> Option<Step> {
    STEP_KEYWORDS.iter().find_map(|keyword| {
        let rest = trimmed.strip_prefix(keyword)?;
        if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
            return None;
        }
        Some(Step {
            keyword: (*keyword).to_string(),
            text: rest.trim().to_string(),
            line,
            attachment: Vec::new(),
        })
    })
}

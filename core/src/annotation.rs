//! Parser for the `chess:` annotation mini-language found in entity comments.

use std::time::Duration;

use thiserror::Error;

use crate::{Direction, Group};

const PREFIX: &str = "chess";
const MAX_GATE_REQUIREMENT: u8 = 4;

/// Capability requested by a single annotation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Annotation {
    /// `chess:wall`
    Wall,
    /// `chess:spike[:delayMs[:startDown]]`
    Spike {
        /// Delay before the spike joins the shared cycle.
        initial_delay: Duration,
        /// Whether the spike starts lowered.
        start_down: bool,
    },
    /// `chess:pit`
    Pit,
    /// `chess:conveyor:{left|right|up|down}`
    Conveyor(Direction),
    /// `chess:flame[:group]`
    Flame {
        /// Group the flame cycles with.
        group: u8,
    },
    /// `chess:button:{a|b|c|d}[:hold]`
    Button {
        /// Gate group driven by the button.
        group: Group,
        /// Whether releasing the button closes its gates again.
        hold: bool,
    },
    /// `chess:gate:{a|b|c|d}[:required]`
    Gate {
        /// Group of buttons that opens the gate.
        group: Group,
        /// Number of pressed buttons needed to open the gate.
        required: u8,
    },
    /// `chess:boulder[:dir]`
    Boulder {
        /// Optional rolling heading.
        heading: Option<Direction>,
    },
    /// `chess:pushable[:dir]`
    Pushable {
        /// Optional redirection applied to boulders landing on the block.
        redirection: Option<Direction>,
    },
    /// `chess:exit`
    Exit,
}

/// Reasons an annotation is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AnnotationError {
    /// The annotation carries no text.
    #[error("annotation is empty")]
    Empty,
    /// The annotation is not addressed to the chess rules.
    #[error("annotation `{0}` is not a chess annotation")]
    NotChess(String),
    /// The tag name is unknown.
    #[error("unknown chess tag `{0}`")]
    UnknownTag(String),
    /// A mandatory argument is absent.
    #[error("chess tag `{tag}` requires an argument")]
    MissingArgument {
        /// Tag missing the argument.
        tag: &'static str,
    },
    /// An argument could not be interpreted.
    #[error("chess tag `{tag}` cannot use `{value}`")]
    InvalidArgument {
        /// Tag owning the argument.
        tag: &'static str,
        /// Offending argument text.
        value: String,
    },
    /// More arguments were supplied than the tag accepts.
    #[error("chess tag `{tag}` has trailing arguments")]
    TrailingArguments {
        /// Tag with surplus arguments.
        tag: &'static str,
    },
}

/// Parses a single annotation such as `<chess:gate:b:2>`.
///
/// Matching is case-insensitive and the surrounding angle brackets are
/// optional. Callers that follow the permissive policy simply discard the
/// error.
pub fn parse_annotation(text: &str) -> Result<Annotation, AnnotationError> {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(trimmed)
        .trim();
    if inner.is_empty() {
        return Err(AnnotationError::Empty);
    }

    let lowered = inner.to_ascii_lowercase();
    let mut parts = lowered.split(':');
    if parts.next() != Some(PREFIX) {
        return Err(AnnotationError::NotChess(inner.to_owned()));
    }
    let tag = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match tag {
        "wall" => no_args("wall", &args).map(|()| Annotation::Wall),
        "pit" => no_args("pit", &args).map(|()| Annotation::Pit),
        "exit" => no_args("exit", &args).map(|()| Annotation::Exit),
        "spike" => parse_spike(&args),
        "conveyor" => {
            let token = args
                .first()
                .ok_or(AnnotationError::MissingArgument { tag: "conveyor" })?;
            let direction = direction_token("conveyor", token)?;
            no_args("conveyor", &args[1..]).map(|()| Annotation::Conveyor(direction))
        }
        "flame" => {
            let group = match args.first() {
                None | Some(&"") => 0,
                Some(token) => token.parse().map_err(|_| invalid("flame", token))?,
            };
            no_args("flame", args.get(1..).unwrap_or_default()).map(|()| Annotation::Flame { group })
        }
        "button" => {
            let group = group_token("button", args.first())?;
            let hold = match args.get(1) {
                None => false,
                Some(token) => bool_token("button", token)?,
            };
            no_args("button", args.get(2..).unwrap_or_default())
                .map(|()| Annotation::Button { group, hold })
        }
        "gate" => {
            let group = group_token("gate", args.first())?;
            let required = match args.get(1) {
                None | Some(&"") => 1,
                Some(token) => token
                    .parse::<u8>()
                    .ok()
                    .filter(|count| (1..=MAX_GATE_REQUIREMENT).contains(count))
                    .ok_or_else(|| invalid("gate", token))?,
            };
            no_args("gate", args.get(2..).unwrap_or_default())
                .map(|()| Annotation::Gate { group, required })
        }
        "boulder" => {
            let heading = optional_direction("boulder", args.first())?;
            no_args("boulder", args.get(1..).unwrap_or_default())
                .map(|()| Annotation::Boulder { heading })
        }
        "pushable" => {
            let redirection = optional_direction("pushable", args.first())?;
            no_args("pushable", args.get(1..).unwrap_or_default())
                .map(|()| Annotation::Pushable { redirection })
        }
        other => Err(AnnotationError::UnknownTag(other.to_owned())),
    }
}

fn parse_spike(args: &[&str]) -> Result<Annotation, AnnotationError> {
    let mut rest = args;
    let mut initial_delay = Duration::ZERO;
    let mut start_down = true;

    if let Some((first, tail)) = rest.split_first() {
        if first.is_empty() {
            rest = tail;
        } else if first.bytes().all(|byte| byte.is_ascii_digit()) {
            let millis: u64 = first.parse().map_err(|_| invalid("spike", first))?;
            initial_delay = Duration::from_millis(millis);
            rest = tail;
        }
    }

    if let Some((first, tail)) = rest.split_first() {
        start_down = bool_token("spike", first)?;
        rest = tail;
    }

    no_args("spike", rest).map(|()| Annotation::Spike {
        initial_delay,
        start_down,
    })
}

fn no_args(tag: &'static str, args: &[&str]) -> Result<(), AnnotationError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(AnnotationError::TrailingArguments { tag })
    }
}

fn invalid(tag: &'static str, value: &str) -> AnnotationError {
    AnnotationError::InvalidArgument {
        tag,
        value: value.to_owned(),
    }
}

fn bool_token(tag: &'static str, token: &str) -> Result<bool, AnnotationError> {
    match token {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(invalid(tag, other)),
    }
}

fn group_token(tag: &'static str, token: Option<&&str>) -> Result<Group, AnnotationError> {
    let token = token.ok_or(AnnotationError::MissingArgument { tag })?;
    Group::from_token(token).ok_or_else(|| invalid(tag, token))
}

fn direction_token(tag: &'static str, token: &str) -> Result<Direction, AnnotationError> {
    Direction::from_token(token).ok_or_else(|| invalid(tag, token))
}

fn optional_direction(
    tag: &'static str,
    token: Option<&&str>,
) -> Result<Option<Direction>, AnnotationError> {
    match token {
        None | Some(&"") => Ok(None),
        Some(token) => direction_token(tag, token).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_tags_case_insensitively() {
        assert_eq!(parse_annotation("<chess:wall>"), Ok(Annotation::Wall));
        assert_eq!(parse_annotation("<CHESS:Pit>"), Ok(Annotation::Pit));
        assert_eq!(parse_annotation("chess:exit"), Ok(Annotation::Exit));
    }

    #[test]
    fn spike_defaults_and_overrides() {
        assert_eq!(
            parse_annotation("<chess:spike>"),
            Ok(Annotation::Spike {
                initial_delay: Duration::ZERO,
                start_down: true,
            })
        );
        assert_eq!(
            parse_annotation("<chess:spike:500:false>"),
            Ok(Annotation::Spike {
                initial_delay: Duration::from_millis(500),
                start_down: false,
            })
        );
        assert_eq!(
            parse_annotation("<chess:spike:false>"),
            Ok(Annotation::Spike {
                initial_delay: Duration::ZERO,
                start_down: false,
            })
        );
        assert!(parse_annotation("<chess:spike:soon>").is_err());
    }

    #[test]
    fn gate_requirement_is_bounded() {
        assert_eq!(
            parse_annotation("<chess:gate:b>"),
            Ok(Annotation::Gate {
                group: Group::B,
                required: 1,
            })
        );
        assert_eq!(
            parse_annotation("<chess:gate:C:3>"),
            Ok(Annotation::Gate {
                group: Group::C,
                required: 3,
            })
        );
        assert!(parse_annotation("<chess:gate:a:5>").is_err());
        assert!(parse_annotation("<chess:gate:e>").is_err());
    }

    #[test]
    fn buttons_flames_and_directions() {
        assert_eq!(
            parse_annotation("<chess:button:d:true>"),
            Ok(Annotation::Button {
                group: Group::D,
                hold: true,
            })
        );
        assert_eq!(
            parse_annotation("<chess:flame:3>"),
            Ok(Annotation::Flame { group: 3 })
        );
        assert_eq!(
            parse_annotation("<chess:flame>"),
            Ok(Annotation::Flame { group: 0 })
        );
        assert_eq!(
            parse_annotation("<chess:conveyor:LEFT>"),
            Ok(Annotation::Conveyor(Direction::Left))
        );
        assert_eq!(
            parse_annotation("<chess:pushable:up>"),
            Ok(Annotation::Pushable {
                redirection: Some(Direction::Up),
            })
        );
        assert_eq!(
            parse_annotation("<chess:boulder>"),
            Ok(Annotation::Boulder { heading: None })
        );
    }

    #[test]
    fn malformed_annotations_are_rejected() {
        assert_eq!(parse_annotation("   "), Err(AnnotationError::Empty));
        assert!(matches!(
            parse_annotation("<light:radius:4>"),
            Err(AnnotationError::NotChess(_))
        ));
        assert!(matches!(
            parse_annotation("<chess:pawn>"),
            Err(AnnotationError::UnknownTag(_))
        ));
        assert_eq!(
            parse_annotation("<chess:conveyor>"),
            Err(AnnotationError::MissingArgument { tag: "conveyor" })
        );
        assert_eq!(
            parse_annotation("<chess:wall:thick>"),
            Err(AnnotationError::TrailingArguments { tag: "wall" })
        );
    }
}

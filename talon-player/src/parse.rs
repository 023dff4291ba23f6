//! # Command Line Parser
//!
//! Turns one input line into an [`Invocation`]: optional modifier prefixes,
//! a command name, then positional arguments. Double quotes group arguments
//! with spaces.

use talon_core::command::{Command, Invocation, Pausing, SeekKind};
use talon_core::osd::OnOsd;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{command}: missing argument <{arg}>")]
    MissingArg {
        command: &'static str,
        arg: &'static str,
    },
    #[error("{command}: bad argument '{value}'")]
    BadArg {
        command: &'static str,
        value: String,
    },
}

/// Split on whitespace, honoring double-quoted groups.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            '\\' => {
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

struct Args<'a> {
    command: &'static str,
    tokens: &'a [String],
    next: usize,
}

impl<'a> Args<'a> {
    fn required(&mut self, arg: &'static str) -> Result<&'a str, ParseError> {
        let token = self.tokens.get(self.next).ok_or(ParseError::MissingArg {
            command: self.command,
            arg,
        })?;
        self.next += 1;
        Ok(token)
    }

    fn optional(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.next)?;
        self.next += 1;
        Some(token.as_str())
    }

    /// Remaining tokens rejoined, for free-text arguments.
    fn rest(&mut self, arg: &'static str) -> Result<String, ParseError> {
        if self.next >= self.tokens.len() {
            return Err(ParseError::MissingArg {
                command: self.command,
                arg,
            });
        }
        let text = self.tokens[self.next..].join(" ");
        self.next = self.tokens.len();
        Ok(text)
    }

    fn parse<T: std::str::FromStr>(&self, raw: &str) -> Result<T, ParseError> {
        raw.parse().map_err(|_| ParseError::BadArg {
            command: self.command,
            value: raw.to_string(),
        })
    }

}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(raw, Some("1") | Some("yes") | Some("true"))
}

pub fn parse_line(line: &str) -> Result<Invocation, ParseError> {
    let tokens = tokenize(line);
    let mut index = 0;

    let mut on_osd = OnOsd::Auto;
    let mut pausing = Pausing::None;
    loop {
        match tokens.get(index).map(String::as_str) {
            Some("no-osd") => on_osd = OnOsd::No,
            Some("osd-msg") => on_osd = OnOsd::Msg,
            Some("osd-bar") => on_osd = OnOsd::Bar,
            Some("osd-msg-bar") => on_osd = OnOsd::MsgBar,
            Some("pausing") => pausing = Pausing::Pause,
            Some("pausing-toggle") => pausing = Pausing::Toggle,
            _ => break,
        }
        index += 1;
    }

    let name = tokens.get(index).ok_or(ParseError::Empty)?.as_str();
    let mut args = Args {
        command: "",
        tokens: &tokens,
        next: index + 1,
    };

    let command = match name {
        "seek" => {
            args.command = "seek";
            let target: f64 = {
                let raw = args.required("target")?;
                args.parse(raw)?
            };
            let kind = match args.optional() {
                None | Some("relative") | Some("0") => SeekKind::Relative,
                Some("percent") | Some("1") => SeekKind::Percent,
                Some("absolute") | Some("2") => SeekKind::Absolute,
                Some(other) => {
                    return Err(ParseError::BadArg {
                        command: "seek",
                        value: other.to_string(),
                    })
                }
            };
            let exact = parse_flag(args.optional());
            Command::Seek { target, kind, exact }
        }
        "set" => {
            args.command = "set";
            Command::Set {
                property: args.required("property")?.to_string(),
                value: args.rest("value")?,
            }
        }
        "add" => {
            args.command = "add";
            let property = args.required("property")?.to_string();
            let step = match args.optional() {
                Some(raw) => Some(args.parse(raw)?),
                None => None,
            };
            Command::Add { property, step }
        }
        "cycle" => {
            args.command = "cycle";
            let property = args.required("property")?.to_string();
            let step = match args.optional() {
                Some(raw) => Some(args.parse(raw)?),
                None => None,
            };
            Command::Cycle { property, step }
        }
        "get" | "get_property" => {
            args.command = "get";
            Command::GetProperty {
                property: args.required("property")?.to_string(),
            }
        }
        "speed_mult" => {
            args.command = "speed_mult";
            let raw = args.required("factor")?;
            Command::SpeedMult {
                factor: args.parse(raw)?,
            }
        }
        "frame_step" => Command::FrameStep,
        "pause" => Command::Cycle {
            property: "pause".to_string(),
            step: None,
        },
        "quit" => {
            args.command = "quit";
            let code = match args.optional() {
                Some(raw) => args.parse(raw)?,
                None => 0,
            };
            Command::Quit { code }
        }
        "playlist_next" => {
            args.command = "playlist_next";
            let force = parse_flag(args.optional());
            Command::PlaylistNext { force }
        }
        "playlist_prev" => {
            args.command = "playlist_prev";
            let force = parse_flag(args.optional());
            Command::PlaylistPrev { force }
        }
        "playlist_clear" => Command::PlaylistClear,
        "loadfile" => {
            args.command = "loadfile";
            let path = args.required("path")?.to_string();
            let append = parse_flag(args.optional());
            Command::LoadFile { path, append }
        }
        "loadlist" => {
            args.command = "loadlist";
            let path = args.required("path")?.to_string();
            let append = parse_flag(args.optional());
            Command::LoadList { path, append }
        }
        "stop" => Command::Stop,
        "osd" => {
            args.command = "osd";
            let level = match args.optional() {
                Some(raw) => Some(args.parse(raw)?),
                None => None,
            };
            Command::OsdLevel { level }
        }
        "print_text" => {
            args.command = "print_text";
            Command::PrintText {
                text: args.rest("text")?,
            }
        }
        "show_text" => {
            args.command = "show_text";
            Command::ShowText {
                text: args.rest("text")?,
                duration_ms: None,
                level: None,
            }
        }
        "show_progress" => Command::ShowProgress,
        "show_chapters" => Command::ShowChapters,
        "show_tracks" => Command::ShowTracks,
        "sub_step" => {
            args.command = "sub_step";
            let raw = args.required("movement")?;
            Command::SubStep {
                movement: args.parse(raw)?,
            }
        }
        "sub_load" => {
            args.command = "sub_load";
            Command::SubLoad {
                path: args.required("path")?.to_string(),
            }
        }
        "screenshot" => {
            args.command = "screenshot";
            let mode = match args.optional() {
                Some(raw) => args.parse(raw)?,
                None => 0,
            };
            let each_frame = parse_flag(args.optional());
            Command::Screenshot { mode, each_frame }
        }
        "run" => {
            args.command = "run";
            Command::Run {
                command: args.rest("command")?,
            }
        }
        "af_switch" => {
            args.command = "af_switch";
            Command::AfSwitch {
                filters: args.required("filters")?.to_string(),
            }
        }
        "af_add" => {
            args.command = "af_add";
            Command::AfAdd {
                filters: args.required("filters")?.to_string(),
            }
        }
        "af_del" => {
            args.command = "af_del";
            Command::AfDel {
                filters: args.required("filters")?.to_string(),
            }
        }
        "af_clr" => Command::AfClr,
        "af_cmdline" => {
            args.command = "af_cmdline";
            Command::AfCmdline {
                filter: args.required("filter")?.to_string(),
                args: args.rest("args")?,
            }
        }
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };

    Ok(Invocation {
        command,
        on_osd,
        pausing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_with_spaces() {
        let inv = parse_line("set speed 1.5").unwrap();
        assert_eq!(
            inv.command,
            Command::Set {
                property: "speed".into(),
                value: "1.5".into()
            }
        );
    }

    #[test]
    fn test_parse_prefixes() {
        let inv = parse_line("no-osd pausing seek 10 relative").unwrap();
        assert_eq!(inv.on_osd, OnOsd::No);
        assert_eq!(inv.pausing, Pausing::Pause);
        assert!(matches!(inv.command, Command::Seek { target, .. } if target == 10.0));
    }

    #[test]
    fn test_parse_quoted_path() {
        let inv = parse_line(r#"loadfile "with space.mkv" 1"#).unwrap();
        assert_eq!(
            inv.command,
            Command::LoadFile {
                path: "with space.mkv".into(),
                append: true
            }
        );
    }

    #[test]
    fn test_parse_show_text_rest() {
        let inv = parse_line("show_text now: ${time-pos}").unwrap();
        assert!(matches!(
            inv.command,
            Command::ShowText { ref text, .. } if text == "now: ${time-pos}"
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_line("   "), Err(ParseError::Empty));
        assert!(matches!(
            parse_line("warp 9"),
            Err(ParseError::UnknownCommand(_))
        ));
        assert!(matches!(
            parse_line("set"),
            Err(ParseError::MissingArg { .. })
        ));
        assert!(matches!(parse_line("seek fast"), Err(ParseError::BadArg { .. })));
    }
}

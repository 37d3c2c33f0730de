//! Single-line text encoding of timer commands.
//!
//! A message is the action name followed by its arguments, separated by a
//! single space. There is no quoting, so arguments containing a space cannot
//! be carried.

use crate::action::{Action, Command};

pub const DELIMITER: char = ' ';

/// Encodes an action name and its arguments. Arity is not checked here.
pub fn encode<S: AsRef<str>>(action: &str, args: &[S]) -> String {
    let mut line = String::from(action);
    for arg in args {
        line.push(DELIMITER);
        line.push_str(arg.as_ref());
    }
    line
}

pub fn encode_command(command: &Command) -> String {
    encode(command.action.name(), command.args.as_slice())
}

/// Splits a line into its name token and argument tokens.
pub fn split(line: &str) -> (&str, Vec<&str>) {
    let mut tokens = line.split(DELIMITER);
    let name = tokens.next().unwrap_or_default();
    (name, tokens.collect())
}

/// Decodes a line into a known command; unknown actions yield `None`.
pub fn decode(line: &str) -> Option<Command> {
    let (name, args) = split(line);
    let action: Action = name.parse().ok()?;
    Some(Command::with_args(action, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bare_and_argument_actions() {
        assert_eq!(encode::<&str>("start", &[]), "start");
        assert_eq!(encode("setgametime", &["1:23.45"]), "setgametime 1:23.45");
        assert_eq!(encode("anything", &["a", "b"]), "anything a b");
    }

    #[test]
    fn decode_then_encode_preserves_every_action() {
        for action in Action::ALL {
            let line = if action.arity() == 1 {
                format!("{} 12:34.5", action.name())
            } else {
                action.name().to_string()
            };
            let command = decode(&line).expect("known action");
            assert_eq!(command.action, action);
            assert_eq!(encode_command(&command), line);
        }
    }

    #[test]
    fn unknown_actions_are_ignored() {
        assert_eq!(decode("bogus foo bar"), None);
        assert_eq!(decode(""), None);
        assert_eq!(decode("SPLIT"), None);
    }

    #[test]
    fn arguments_pass_through_positionally() {
        let command = decode("setloadingtimes 0:05 extra").expect("known action");
        assert_eq!(command.action, Action::SetLoadingTimes);
        assert_eq!(command.args, vec!["0:05".to_string(), "extra".to_string()]);
    }

    #[test]
    fn consecutive_delimiters_keep_empty_tokens() {
        let command = decode("split  x").expect("known action");
        assert_eq!(command.args, vec![String::new(), "x".to_string()]);
        assert_eq!(encode_command(&command), "split  x");
    }
}

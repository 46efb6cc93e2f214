//! Operator verb parsing
//!
//! The verb set is closed; any other non-empty line is shorthand for
//! `exec` with the whole line as the shell command.

use thiserror::Error;

/// A parsed operator line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Help,
    Exit,
    List,
    Select(usize),
    Ping,
    Exec(String),
    CmdStates,
    Alias(String),
}

/// Malformed operator input
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("incorrect command format")]
    BadFormat,

    #[error("incorrect index: {0}")]
    BadIndex(String),
}

/// Usage text for the `help` verb.
pub const HELP_TEXT: &str = "\
help\t\t\tprint help for commands
exit\t\t\tshutdown the controller
ping\t\t\tcheck if the selected agent is alive
list\t\t\tlist connected agents
cmd_states\t\tlist in-flight command states
exec [command]\t\texecute shell command on the selected agent
select [agent number]\tselect agent to interact with
alias [agent name]\tset alias for the selected agent
";

/// Parse one operator line into a verb.
pub fn parse(line: &str) -> Result<Verb, ParseError> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "help" if rest.is_empty() => Ok(Verb::Help),
        "exit" if rest.is_empty() => Ok(Verb::Exit),
        "list" if rest.is_empty() => Ok(Verb::List),
        "ping" if rest.is_empty() => Ok(Verb::Ping),
        "cmd_states" if rest.is_empty() => Ok(Verb::CmdStates),
        "select" => {
            if rest.is_empty() {
                return Err(ParseError::BadFormat);
            }
            rest.parse::<usize>()
                .map(Verb::Select)
                .map_err(|_| ParseError::BadIndex(rest.to_string()))
        }
        "exec" => {
            if rest.is_empty() {
                Err(ParseError::BadFormat)
            } else {
                Ok(Verb::Exec(rest.to_string()))
            }
        }
        "alias" => {
            if rest.is_empty() {
                Err(ParseError::BadFormat)
            } else {
                Ok(Verb::Alias(rest.to_string()))
            }
        }
        // Anything else goes to the shell verbatim.
        _ => Ok(Verb::Exec(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_verbs() {
        assert_eq!(parse("help").unwrap(), Verb::Help);
        assert_eq!(parse("exit").unwrap(), Verb::Exit);
        assert_eq!(parse("list").unwrap(), Verb::List);
        assert_eq!(parse("ping").unwrap(), Verb::Ping);
        assert_eq!(parse("cmd_states").unwrap(), Verb::CmdStates);
    }

    #[test]
    fn test_parse_select() {
        assert_eq!(parse("select 3").unwrap(), Verb::Select(3));
        assert_eq!(parse("select").unwrap_err(), ParseError::BadFormat);
        assert_eq!(
            parse("select two").unwrap_err(),
            ParseError::BadIndex("two".to_string())
        );
    }

    #[test]
    fn test_parse_exec() {
        assert_eq!(
            parse("exec cat /etc/hostname").unwrap(),
            Verb::Exec("cat /etc/hostname".to_string())
        );
        assert_eq!(parse("exec").unwrap_err(), ParseError::BadFormat);
    }

    #[test]
    fn test_parse_alias() {
        assert_eq!(
            parse("alias build box").unwrap(),
            Verb::Alias("build box".to_string())
        );
        assert_eq!(parse("alias").unwrap_err(), ParseError::BadFormat);
    }

    #[test]
    fn test_unknown_line_falls_through_to_exec() {
        assert_eq!(parse("whoami").unwrap(), Verb::Exec("whoami".to_string()));
        assert_eq!(
            parse("ls -la /tmp").unwrap(),
            Verb::Exec("ls -la /tmp".to_string())
        );
        // A known verb with unexpected trailing words is shell input too.
        assert_eq!(
            parse("help me please").unwrap(),
            Verb::Exec("help me please".to_string())
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(parse("  ping  ").unwrap(), Verb::Ping);
        assert_eq!(
            parse("  exec  uptime ").unwrap(),
            Verb::Exec("uptime".to_string())
        );
    }
}

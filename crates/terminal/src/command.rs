use std::fmt;

use assist::auth::AuthForm;
use model::{HelpType, Role};

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Home,
    LoginScreen,
    Access(Role),
    Tab(Role),
    Authenticate(AuthForm),
    Logout,
    Locate,
    Suggest(String),
    Route(String),
    Confirm(HelpType),
    Cancel,
    Refresh,
    /// Zero based, the user types the number shown in the feed.
    Accept(usize),
    Complete,
    State,
    Contract,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnknownCommand(String),
    MissingArgument(&'static str),
    InvalidArgument { argument: &'static str, value: String },
}

impl std::error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParseError::UnknownCommand(command) => {
                write!(f, "unknown command '{command}', try 'help'")
            }
            ParseError::MissingArgument(argument) => write!(f, "missing <{argument}>"),
            ParseError::InvalidArgument { argument, value } => {
                write!(f, "'{value}' is not a valid <{argument}>")
            }
        }
    }
}

pub const HELP: &str = "\
home | login-screen | access <role> | tab <role>
login <role> <email> <password>
signup <role> <email> <password> [name] [phone]
logout | locate | suggest <text> | route <destination> | confirm <help-type> | cancel
refresh | accept <n> | complete
state | contract | help | quit";

/// Parses one line. Blank lines give `None`.
pub fn parse(line: &str) -> Result<Option<Input>, ParseError> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };

    let input = match command.to_lowercase().as_str() {
        "home" => Input::Home,
        "login-screen" => Input::LoginScreen,
        "access" => Input::Access(role(words.next())?),
        "tab" => Input::Tab(role(words.next())?),
        "login" | "signup" => {
            let role = role(words.next())?;
            let email = words.next().ok_or(ParseError::MissingArgument("email"))?;
            let password = words.next().ok_or(ParseError::MissingArgument("password"))?;
            if command.eq_ignore_ascii_case("login") {
                Input::Authenticate(AuthForm::login(role, email, password))
            } else {
                let name = words.next().map(str::to_owned);
                let phone = words.next().map(str::to_owned);
                Input::Authenticate(
                    AuthForm::signup(role, email, password).with_contact(name, phone),
                )
            }
        }
        "logout" => Input::Logout,
        "locate" => Input::Locate,
        "suggest" => Input::Suggest(rest(words, "text")?),
        "route" => Input::Route(rest(words, "destination")?),
        "confirm" => {
            let help_type = words.next().ok_or(ParseError::MissingArgument("help-type"))?;
            // unknown kinds are sent as "other"
            Input::Confirm(help_type.parse().unwrap_or(HelpType::Other))
        }
        "cancel" => Input::Cancel,
        "refresh" => Input::Refresh,
        "accept" => {
            let value = words.next().ok_or(ParseError::MissingArgument("n"))?;
            match value.parse::<usize>() {
                Ok(n) if n > 0 => Input::Accept(n - 1),
                _ => {
                    return Err(ParseError::InvalidArgument {
                        argument: "n",
                        value: value.to_owned(),
                    })
                }
            }
        }
        "complete" => Input::Complete,
        "state" => Input::State,
        "contract" => Input::Contract,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        _ => return Err(ParseError::UnknownCommand(command.to_owned())),
    };
    Ok(Some(input))
}

/// The remaining words, joined by single spaces.
fn rest<'a, I>(words: I, argument: &'static str) -> Result<String, ParseError>
where
    I: Iterator<Item = &'a str>,
{
    let text = words.collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return Err(ParseError::MissingArgument(argument));
    }
    Ok(text)
}

fn role(word: Option<&str>) -> Result<Role, ParseError> {
    let word = word.ok_or(ParseError::MissingArgument("role"))?;
    word.parse().map_err(|_| ParseError::InvalidArgument {
        argument: "role",
        value: word.to_owned(),
    })
}

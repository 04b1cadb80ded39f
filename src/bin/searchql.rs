use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use tracing_subscriber::EnvFilter;

use searchql::{
    EditMachine, ParseResult, QueryParser, SearchConfig, Token, TokenKey, TokenPart, unparse,
    word_at_cursor,
};

/// Main entry point for the searchql command-line tool.
///
/// Parses search queries, shows their tokens and valid operators, and applies
/// single-token edits the way an interactive search bar would.
fn main() {
    init_logging();

    let matches = cli().get_matches();

    if let Err(e) = run(&matches) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("SEARCHQL_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cli() -> Command {
    let query = Arg::new("query")
        .help("Search query")
        .value_name("QUERY")
        .required(true)
        .index(1);
    let token = Arg::new("token")
        .long("token")
        .short('t')
        .help("Token key, e.g. filter:0")
        .value_name("KEY")
        .required(true);

    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Parses and edits search queries")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Field registry and options (JSON, TOML or YAML)")
                .value_name("FILE")
                .global(true),
        )
        .arg(
            Arg::new("flatten-parens")
                .long("flatten-parens")
                .help("Emit single parentheses instead of groups")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-boolean")
                .long("no-boolean")
                .help("Treat AND/OR as free text")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("parse")
                .about("Show the tokens of a query")
                .arg(query.clone())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help("Print the parse result as JSON")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("raw")
                        .long("raw")
                        .help("Do not merge free text and whitespace")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("operators")
                .about("List the operators valid for a filter token")
                .arg(query.clone())
                .arg(token.clone()),
        )
        .subcommand(
            Command::new("edit")
                .about("Replace one part of a token and print the new query")
                .arg(query.clone())
                .arg(token.clone())
                .arg(
                    Arg::new("part")
                        .long("part")
                        .short('p')
                        .help("key, operator, value, args or text")
                        .value_name("PART")
                        .default_value("value"),
                )
                .arg(
                    Arg::new("text")
                        .long("text")
                        .help("New text for the part")
                        .value_name("TEXT")
                        .required(true)
                        .allow_hyphen_values(true),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Remove a token and print the new query")
                .arg(query.clone())
                .arg(token),
        )
        .subcommand(
            Command::new("word")
                .about("Print the word under the cursor")
                .arg(Arg::new("text").value_name("TEXT").required(true).index(1))
                .arg(
                    Arg::new("cursor")
                        .long("cursor")
                        .help("Byte offset of the cursor")
                        .value_name("OFFSET")
                        .value_parser(clap::value_parser!(usize))
                        .required(true),
                ),
        )
}

fn run(matches: &ArgMatches) -> Result<(), Box<dyn Error>> {
    let parser = build_parser(matches)?;

    match matches.subcommand() {
        Some(("parse", sub)) => {
            let query = required(sub, "query")?;
            let result = if sub.get_flag("raw") {
                parser.tokenize(query)
            } else {
                parser.parse(query)
            };
            if sub.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_tokens(&parser, &result);
            }
        }
        Some(("operators", sub)) => {
            let result = parser.parse(required(sub, "query")?);
            let key = token_key(sub)?;
            let token = result
                .find(&key)
                .ok_or_else(|| format!("no token {} in query", key))?;
            let operators: Vec<String> = parser
                .valid_operators_or_default(token)
                .into_iter()
                .map(|op| format!("{} ({})", op.label(), op.symbol()))
                .collect();
            if operators.is_empty() {
                return Err(format!("{} is not a filter", key).into());
            }
            for op in operators {
                println!("{}", op);
            }
        }
        Some(("edit", sub)) => {
            let result = parser.parse(required(sub, "query")?);
            let key = token_key(sub)?;
            let part: TokenPart = required(sub, "part")?.parse()?;
            let text = required(sub, "text")?;

            let t = EditMachine::new().begin_edit(&parser, &result, key, part);
            if !t.machine.is_editing() {
                return Err(format!("token {} has no {} part", key, part).into());
            }
            let t = t.machine.update_buffer(text).machine.commit(&parser);
            let updated = t.result.unwrap_or(result);
            println!("{}", unparse(&updated));
        }
        Some(("delete", sub)) => {
            let result = parser.parse(required(sub, "query")?);
            let key = token_key(sub)?;
            let t = EditMachine::new().delete_token(&parser, &result, key);
            let updated = t.result.ok_or_else(|| format!("no token {} in query", key))?;
            println!("{}", unparse(&updated));
        }
        Some(("word", sub)) => {
            let text = required(sub, "text")?;
            let cursor = sub.get_one::<usize>("cursor").copied().unwrap_or(0);
            println!("{}", word_at_cursor(text, cursor));
        }
        _ => unreachable!("subcommand is required"),
    }

    Ok(())
}

fn build_parser(matches: &ArgMatches) -> Result<QueryParser, Box<dyn Error>> {
    let config = match matches.get_one::<String>("config") {
        Some(path) => SearchConfig::load(path)?,
        None => SearchConfig::default(),
    };

    let mut options = config.options;
    if matches.get_flag("flatten-parens") {
        options.flatten_paren_groups = true;
    }
    if matches.get_flag("no-boolean") {
        options.allow_boolean = false;
    }

    Ok(config.parser()?.with_options(options))
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str, Box<dyn Error>> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| format!("missing argument '{}'", name).into())
}

fn token_key(matches: &ArgMatches) -> Result<TokenKey, Box<dyn Error>> {
    Ok(required(matches, "token")?.parse()?)
}

fn print_tokens(parser: &QueryParser, result: &ParseResult) {
    for (key, token) in result.keyed() {
        let span = token.span().to_string();
        let mut details = Vec::new();

        match token {
            Token::Filter(filter) => {
                details.push(format!("key={}", filter.key.name));
                details.push(format!("op={}", filter.operator));
                details.push(format!("value={:?}", filter.value.raw()));
                if let Some(ty) = filter.field_type {
                    details.push(format!("type={}", ty));
                }
            }
            Token::AggregateFilter(agg) => {
                let args: Vec<&str> = agg.key.args.iter().map(|a| a.text.as_str()).collect();
                details.push(format!("fn={}({})", agg.key.name, args.join(", ")));
                details.push(format!("op={}", agg.operator));
                details.push(format!("value={:?}", agg.value.raw()));
                if let Some(ty) = agg.field_type {
                    details.push(format!("type={}", ty));
                }
            }
            Token::LogicBoolean(boolean) => details.push(format!("{:?}", boolean.op)),
            Token::FreeText(_)
            | Token::Spaces(_)
            | Token::ParenGroup(_)
            | Token::Paren(_) => {}
        }

        if let Some(invalid) = token.invalid() {
            details.push(format!("invalid={}", invalid.reason));
            let ops = parser.valid_operators(token);
            if !ops.is_empty() {
                let labels: Vec<&str> = ops.iter().map(|op| op.label()).collect();
                details.push(format!("valid=[{}]", labels.join(", ")));
            }
        }

        println!(
            "{:<20} {:<9} {:?} {}",
            key.to_string(),
            span,
            token.text(),
            details.join(" ")
        );
    }
}

//! `folio` command line: flag parsing and command dispatch over a local snapshot.

pub mod outputformatter;

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};

use crate::config::{FolioConfig, FolioConfigOverrides};
use crate::error::AppError;
use crate::identity::{Library, RequestContext, Role, Verb};
use crate::search::SearchSpec;
use crate::services::Services;

pub const USAGE: &str = "Usage:
  folio [--snapshot <path>] [--config <file>] [--json] <command> [args]

Commands:
  init <admin> <home_library> [--password <pw>]       register the first admin and their library
  library <name> [--collective] [--public]             register a library
  user <name> <home_library> [--password <pw>]         register a user
  grant <role> <library> <user> --as <requestor>       grant ADMIN|AUTHOR|READER|REVIEWER
  revoke <role> <library> <user> --as <requestor>      revoke a grant
  authorized <user> <verb> <library-or-path>           print true/false
  create <json> --as <requestor>                       create a document
  update <json> --as <requestor>                       update a document
  search <spec-json> --as <requestor>                  run a search
  context <id> <n> --as <requestor>                    records around <id>
  delete <id> --as <requestor>                         delete a document
  tags <library> --as <requestor>                      list library tags

Flags:
  --snapshot <path>   state file (default: $FOLIO_SNAPSHOT or folio.snap)
  --config <file>     JSON config file
  --as <user>         requestor (default: the OS login name)
  --password <pw>     with --as: authenticate through a session first
  --json              print JSON instead of tables
  -h, --help          show this help";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init { admin: String, home: String },
    Library { name: String, collective: bool, public: bool },
    User { name: String, home: String },
    Grant { role: Role, library: String, user: String },
    Revoke { role: Role, library: String, user: String },
    Authorized { user: String, verb: Verb, target: String },
    Create { json: Value },
    Update { json: Value },
    Search { spec: Value },
    Context { id: String, n: u64 },
    Delete { id: String },
    Tags { library: String },
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub command: Command,
    pub snapshot: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub as_user: Option<String>,
    pub password: Option<String>,
    pub json: bool,
}

fn parse_json(s: &str) -> Result<Value> {
    serde_json::from_str(s).with_context(|| format!("invalid JSON argument: {}", s))
}

pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut positional: Vec<String> = Vec::new();
    let mut out = CliArgs { command: Command::Help, snapshot: None, config: None, as_user: None, password: None, json: false };
    let (mut collective, mut public) = (false, false);
    let mut i = 0;
    while i < args.len() {
        let a = args[i].as_str();
        let mut value = |name: &str| -> Result<String> {
            i += 1;
            args.get(i).cloned().ok_or_else(|| anyhow!("{} requires a value", name))
        };
        match a {
            "--snapshot" => out.snapshot = Some(PathBuf::from(value("--snapshot")?)),
            "--config" => out.config = Some(PathBuf::from(value("--config")?)),
            "--as" => out.as_user = Some(value("--as")?),
            "--password" => out.password = Some(value("--password")?),
            "--json" => out.json = true,
            "--collective" => collective = true,
            "--public" => public = true,
            "-h" | "--help" => return Ok(out),
            s if s.starts_with("--") => bail!("unknown flag {}", s),
            s => positional.push(s.to_string()),
        }
        i += 1;
    }
    let Some((cmd, rest)) = positional.split_first() else { return Ok(out); };
    let need = |n: usize| -> Result<()> {
        if rest.len() < n { bail!("'{}' expects {} argument(s)\n\n{}", cmd, n, USAGE) } else { Ok(()) }
    };
    out.command = match cmd.as_str() {
        "init" => { need(2)?; Command::Init { admin: rest[0].clone(), home: rest[1].clone() } }
        "library" => { need(1)?; Command::Library { name: rest[0].clone(), collective, public } }
        "user" => { need(2)?; Command::User { name: rest[0].clone(), home: rest[1].clone() } }
        "grant" | "revoke" => {
            need(3)?;
            let role = Role::parse(&rest[0])?;
            let (library, user) = (rest[1].clone(), rest[2].clone());
            if cmd == "grant" { Command::Grant { role, library, user } } else { Command::Revoke { role, library, user } }
        }
        "authorized" => { need(3)?; Command::Authorized { user: rest[0].clone(), verb: Verb::parse(&rest[1])?, target: rest[2].clone() } }
        "create" => { need(1)?; Command::Create { json: parse_json(&rest[0])? } }
        "update" => { need(1)?; Command::Update { json: parse_json(&rest[0])? } }
        "search" => { need(1)?; Command::Search { spec: parse_json(&rest[0])? } }
        "context" => {
            need(2)?;
            let n = rest[1].parse::<u64>().with_context(|| format!("invalid window size '{}'", rest[1]))?;
            Command::Context { id: rest[0].clone(), n }
        }
        "delete" => { need(1)?; Command::Delete { id: rest[0].clone() } }
        "tags" => { need(1)?; Command::Tags { library: rest[0].clone() } }
        "help" => Command::Help,
        other => bail!("unknown command '{}'\n\n{}", other, USAGE),
    };
    Ok(out)
}

impl CliArgs {
    pub fn resolve_config(&self) -> Result<FolioConfig> {
        let cli = FolioConfigOverrides { snapshot_path: self.snapshot.clone(), ..Default::default() };
        let mut cfg = FolioConfig::resolve(self.config.as_deref(), &cli)?;
        if cfg.snapshot_path.is_none() {
            cfg.snapshot_path = Some(PathBuf::from("folio.snap"));
        }
        // one-shot process: rebuilding caches in the background buys nothing
        cfg.tag_cache_enabled = false;
        Ok(cfg)
    }

    fn context(&self, services: &Services) -> Result<RequestContext> {
        // Without --as the OS login name acts as the requestor.
        let user = self.as_user.clone().unwrap_or_else(whoami::username);
        match &self.password {
            Some(pw) => {
                let session = services.login(&user, pw)?;
                Ok(services.authenticate(&session.token)?)
            }
            None => Ok(RequestContext::new(user)),
        }
    }
}

fn emit(args: &CliArgs, v: &Value) -> Result<()> {
    println!("{}", if args.json { serde_json::to_string(v)? } else { serde_json::to_string_pretty(v)? });
    Ok(())
}

fn emit_rows(args: &CliArgs, rows: &[Value], summary: &str) -> Result<()> {
    if args.json || !outputformatter::print_rows(rows, summary) {
        emit(args, &Value::Array(rows.to_vec()))?;
    }
    Ok(())
}

/// Execute one command. State-changing commands persist the snapshot on success.
pub fn run(args: &CliArgs, services: &Services) -> Result<()> {
    let mutated = match &args.command {
        Command::Help => {
            println!("{}", USAGE);
            false
        }
        Command::Init { admin, home } => {
            services.register_library(Library::user(home.clone()))?;
            services.register_user(admin, home, args.password.as_deref())?;
            services.roles.bootstrap_ws_admin(admin)?;
            emit(args, &json!({ "admin": admin, "home_library": home }))?;
            true
        }
        Command::Library { name, collective, public } => {
            let lib = if *collective { Library::collective(name.clone(), *public) } else { Library::user(name.clone()) };
            services.register_library(lib)?;
            emit(args, &json!({ "library": name }))?;
            true
        }
        Command::User { name, home } => {
            services.register_user(name, home, args.password.as_deref())?;
            emit(args, &json!({ "user": name, "home_library": home }))?;
            true
        }
        Command::Grant { role, library, user } => {
            let ctx = args.context(services)?;
            services.roles.grant_role(&ctx.requestor, *role, library, user)?;
            emit(args, &json!({ "granted": role.as_str(), "library": library, "user": user }))?;
            true
        }
        Command::Revoke { role, library, user } => {
            let ctx = args.context(services)?;
            services.roles.revoke_role(&ctx.requestor, *role, library, user)?;
            emit(args, &json!({ "revoked": role.as_str(), "library": library, "user": user }))?;
            true
        }
        Command::Authorized { user, verb, target } => {
            let ok = if target.contains('/') {
                services.authz.is_authorized_path(user, *verb, target)
            } else {
                services.authz.is_authorized(user, *verb, target)
            };
            println!("{}", ok);
            false
        }
        Command::Create { json } => {
            let ctx = args.context(services)?;
            let doc = services.docs.create(&ctx, json)?;
            emit(args, &doc.to_json())?;
            true
        }
        Command::Update { json } => {
            let ctx = args.context(services)?;
            let doc = services.docs.update(&ctx, json)?;
            emit(args, &doc.to_json())?;
            true
        }
        Command::Search { spec } => {
            let ctx = args.context(services)?;
            let spec = SearchSpec::from_json(spec)?;
            let res = services.docs.search(&ctx, &spec)?;
            if args.json {
                emit(args, &serde_json::to_value(&res)?)?;
            } else {
                emit_rows(args, &res.values, &format!("value_count: {}\nquery: {}", res.value_count, res.query_diagnostic))?;
            }
            false
        }
        Command::Context { id, n } => {
            let ctx = args.context(services)?;
            let res = services.docs.context(&ctx, id, *n)?;
            emit_rows(args, &res.values, &format!("value_count: {}", res.value_count))?;
            false
        }
        Command::Delete { id } => {
            let ctx = args.context(services)?;
            services.docs.delete(&ctx, id)?;
            emit(args, &json!({ "deleted": id }))?;
            true
        }
        Command::Tags { library } => {
            let ctx = args.context(services)?;
            let tags = services.docs.tags(&ctx, library)?;
            emit(args, &json!(tags))?;
            false
        }
    };
    if mutated {
        services.save()?;
    }
    Ok(())
}

/// Process exit code for a failed command: 2 for caller errors, 3 for backend trouble.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(e) if e.is_backend_unavailable() => 3,
        _ => 2,
    }
}

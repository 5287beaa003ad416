use anyhow::Context;
use tracing::info;

use petrichor::config::Config;
use petrichor::db::Db;
use petrichor::email::{self, EmailSender};
use petrichor::request::{self, dialog, FieldStatus};
use petrichor::room::{self, graph, matrix, LinkParams, RoomStore};

fn usage_and_exit() -> ! {
    eprintln!(
        "petrichor_adminctl\n\n\
USAGE:\n\
  petrichor_adminctl [--data PATH] <command> [args...]\n\n\
ENV:\n\
  PETRICHOR_DATA_PATH   default locks/petrichor.json\n\
  PETRICHOR_BASE_URL    default http://127.0.0.1:8008\n\
  PETRICHOR_EMAIL_MODE  disabled|smtp|file (default disabled)\n\n\
COMMANDS:\n\
  super-user <name> [--password PW]\n\
  reset-password <name> [--password PW]\n\
  create-room\n\
  room-set <id> <title|description|size> <value>\n\
  link <id> <dir> <to> [--one-way]\n\
  unlink <id> <dir> [--one-way]\n\
  grid <id> [--depth N] [--size N] [--priority a,b,..]\n\
  exits <id>\n\
  grant <actor> <target> <perm>\n\
  revoke <actor> <target> <perm>\n\
  permissions <name>\n\
  apply <name>\n\
  set-field <name> <rid> <field> <value>\n\
  advance <name> <rid>\n\
  review-field <name> <rid> <field> [--change TEXT]\n\
  cancel <name> <rid>\n\
  fulfill <rid>\n\
  show-request <rid> [--as NAME]\n\
  add-email <name> <addr>\n\
  verify-email <name> <email-id>\n\
  verify-token <token>\n\
  recover-username <addr>\n\
  recover-password <addr>\n\
  reset-password-token <token> [--password PW]\n"
    );
    std::process::exit(2);
}

fn gen_password() -> anyhow::Result<String> {
    petrichor::random_b64url(18)
}

fn take_flag_value(rest: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < rest.len() {
        if rest[i] == flag {
            return rest.get(i + 1).cloned();
        }
        i += 1;
    }
    None
}

fn has_flag(rest: &[String], flag: &str) -> bool {
    rest.iter().any(|a| a == flag)
}

fn parse_id(s: &str) -> i64 {
    s.parse().unwrap_or_else(|_| usage_and_exit())
}

fn require_pid(db: &Db, name: &str) -> anyhow::Result<i64> {
    db.players
        .get_by_username(name)
        .map(|p| p.id)
        .with_context(|| format!("no player named {name:?}"))
}

fn print_json(v: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(v)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,petrichor=info".into()),
        )
        .with_target(false)
        .init();

    let mut cfg = Config::from_env()?;

    let mut args = std::env::args().skip(1);
    let mut cmd: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();

    while let Some(a) = args.next() {
        if a == "--data" {
            let v = args.next().unwrap_or_else(|| usage_and_exit());
            cfg.data_path = v.into();
            continue;
        }
        cmd = Some(a);
        rest.extend(args);
        break;
    }

    let Some(cmd) = cmd else { usage_and_exit() };

    let mut db = Db::load(&cfg.data_path)?;
    let now = petrichor::now_unix();
    let purged = db.tokens.purge_expired(now);
    let mut dirty = true;

    match cmd.as_str() {
        "super-user" | "reset-password" => {
            if rest.is_empty() {
                usage_and_exit();
            }
            let name = rest[0].clone();
            let password = if let Some(pw) = take_flag_value(&rest[1..], "--password") {
                pw
            } else {
                gen_password()?
            };

            let pid = if cmd == "super-user" {
                let pid = db.players.create(&name, &password, now)?.id;
                db.permissions.seed_root(pid, now);
                pid
            } else {
                let pid = require_pid(&db, &name)?;
                db.players.set_password(pid, &password)?;
                pid
            };
            println!("pid: {pid}");
            println!("password: {password}");
        }
        "create-room" => {
            if !rest.is_empty() {
                usage_and_exit();
            }
            let r = db.rooms.create();
            info!(id = r.id, "room created");
            print_json(&r)?;
        }
        "room-set" => {
            if rest.len() != 3 {
                usage_and_exit();
            }
            let id = parse_id(&rest[0]);
            match rest[1].as_str() {
                "title" => db.rooms.update_title(id, &rest[2])?,
                "description" => db.rooms.update_description(id, &rest[2])?,
                "size" => db
                    .rooms
                    .update_size(id, rest[2].parse().unwrap_or_else(|_| usage_and_exit()))?,
                _ => usage_and_exit(),
            }
            print_json(&db.rooms.get_room(id)?)?;
        }
        "link" => {
            if rest.len() < 3 {
                usage_and_exit();
            }
            room::link(
                &mut db.rooms,
                LinkParams {
                    id: parse_id(&rest[0]),
                    to: parse_id(&rest[2]),
                    direction: &rest[1],
                    two_way: !has_flag(&rest[3..], "--one-way"),
                },
            )?;
        }
        "unlink" => {
            if rest.len() < 2 {
                usage_and_exit();
            }
            let id = parse_id(&rest[0]);
            if has_flag(&rest[2..], "--one-way") {
                room::unlink(&mut db.rooms, id, &rest[1])?;
            } else {
                room::clear_exit(&mut db.rooms, id, &rest[1])?;
            }
        }
        "grid" => {
            if rest.is_empty() {
                usage_and_exit();
            }
            dirty = false;
            let id = parse_id(&rest[0]);
            let depth = take_flag_value(&rest[1..], "--depth")
                .map(|v| v.parse().unwrap_or_else(|_| usage_and_exit()))
                .unwrap_or(cfg.graph_depth);
            let size = take_flag_value(&rest[1..], "--size")
                .map(|v| v.parse().unwrap_or_else(|_| usage_and_exit()))
                .unwrap_or(cfg.grid_size);
            let priority: Vec<i64> = take_flag_value(&rest[1..], "--priority")
                .map(|v| v.split(',').filter(|s| !s.is_empty()).map(parse_id).collect())
                .unwrap_or_default();
            let m = matrix::grid_for_room(&db.rooms, id, depth, size, &priority)?;
            print!("{}", matrix::render_grid(&m));
        }
        "exits" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            dirty = false;
            let r = db.rooms.get_room(parse_id(&rest[0]))?;
            let g = graph::build_graph(&db.rooms, &r, 1, 0)?;
            print_json(&g.bind_exits())?;
        }
        "grant" | "revoke" => {
            if rest.len() != 3 {
                usage_and_exit();
            }
            let actor = require_pid(&db, &rest[0])?;
            let target = require_pid(&db, &rest[1])?;
            let perms = db.permissions.for_player(actor);
            db.permissions
                .toggle_player_permission(&perms, target, &rest[2], cmd == "grant", now)?;
            print_json(&db.permissions.for_player(target).list())?;
        }
        "permissions" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            dirty = false;
            let pid = require_pid(&db, &rest[0])?;
            print_json(&db.permissions.for_player(pid).list())?;
        }
        "apply" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let req = db.requests.create_character_application(pid, now)?;
            println!("rid: {}", req.id);
        }
        "set-field" => {
            if rest.len() != 4 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let rid = parse_id(&rest[1]);
            let field = rest[2].as_str();
            let group = request::definition_for(&db.requests.require(rid)?.kind)?;
            if group.get(field).is_some_and(|fd| fd.subfields.is_some()) {
                let values: Vec<String> = rest[3]
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                db.requests
                    .update_field_subfields(pid, rid, field, &values, now)?;
            } else {
                db.requests.update_field(pid, rid, field, &rest[3], now)?;
            }
            println!("status: {}", db.requests.require(rid)?.status);
            if let Some(next) = db.requests.next_incomplete_field(rid)? {
                println!("next: {}", next.kind);
            }
        }
        "advance" => {
            if rest.len() != 2 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let perms = db.permissions.for_player(pid);
            let status = db
                .requests
                .advance_status(pid, &perms, parse_id(&rest[1]), now)?;
            println!("status: {status}");
        }
        "review-field" => {
            if rest.len() < 3 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let perms = db.permissions.for_player(pid);
            let rid = parse_id(&rest[1]);
            let field = rest[2].as_str();
            if let Some(text) = take_flag_value(&rest[3..], "--change") {
                db.requests
                    .create_change_request(pid, &perms, rid, field, &text, now)?;
            }
            let status = db.requests.update_field_status(pid, &perms, rid, field)?;
            println!("{field}: {}", if status == FieldStatus::Approved { "approved" } else { "changes requested" });
            if let Some(next) = db.requests.next_unreviewed_field(rid)? {
                println!("next: {}", next.kind);
            }
        }
        "cancel" => {
            if rest.len() != 2 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let perms = db.permissions.for_player(pid);
            let status = db
                .requests
                .delete_request(pid, &perms, parse_id(&rest[1]), now)?;
            println!("status: {status}");
        }
        "fulfill" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            let rid = parse_id(&rest[0]);
            let img = db
                .requests
                .fulfill(rid, &mut db.images, &mut db.characters, now)?;
            print_json(&img)?;
        }
        "show-request" => {
            if rest.is_empty() {
                usage_and_exit();
            }
            dirty = false;
            let rid = parse_id(&rest[0]);
            let req = db.requests.require(rid)?;
            println!("{}", request::title(req));
            print_json(req)?;
            print_json(&db.requests.changes_for(rid))?;
            print_json(&db.requests.comments_for(rid))?;
            if let Some(name) = take_flag_value(&rest[1..], "--as") {
                let pid = require_pid(&db, &name)?;
                let perms = db.permissions.for_player(pid);
                for d in dialog::dialogs_for(pid, &perms, req) {
                    println!("[{}] {}", d.button, d.text);
                }
            }
        }
        "add-email" => {
            if rest.len() != 2 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let e = db.emails.add(pid, &rest[1])?;
            println!("email id: {}", e.id);

            let token = db.tokens.issue_verification(e.id, now)?;
            let link = email::verification_link(&cfg.base_url, &token);
            println!("link: {link}");
            let sender = EmailSender::from_config(&cfg.email)?;
            sender
                .send_best_effort(&email::verification_mail(&e.address, &link))
                .await;
        }
        "verify-email" => {
            if rest.len() != 2 {
                usage_and_exit();
            }
            let pid = require_pid(&db, &rest[0])?;
            let id = parse_id(&rest[1]);
            if db.emails.get(id).map(|e| e.pid) != Some(pid) {
                anyhow::bail!("email {id} does not belong to {}", rest[0]);
            }
            print_json(&db.emails.mark_verified(id)?)?;
        }
        "verify-token" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            print_json(&db.verify_email(&rest[0], now)?)?;
        }
        "recover-username" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            let address = rest[0].as_str();
            if !email::is_address_valid(address) {
                anyhow::bail!("invalid email address {address:?}");
            }
            if let Some(pid) = db.player_for_verified_address(address) {
                let username = db.players.require(pid)?.username.clone();
                let sender = EmailSender::from_config(&cfg.email)?;
                sender
                    .send(&email::username_recovery_mail(address, &username))
                    .await?;
            }
            let id = db.tokens.issue_username_recovery(address, now)?;
            println!("confirmation: {id}");
        }
        "recover-password" => {
            if rest.len() != 1 {
                usage_and_exit();
            }
            let address = rest[0].as_str();
            if !email::is_address_valid(address) {
                anyhow::bail!("invalid email address {address:?}");
            }
            if let Some(pid) = db.player_for_verified_address(address) {
                let token = db.tokens.issue_password_recovery(pid, now)?;
                let link = email::password_recovery_link(&cfg.base_url, &token);
                println!("link: {link}");
                let sender = EmailSender::from_config(&cfg.email)?;
                sender
                    .send_best_effort(&email::password_recovery_mail(address, &link))
                    .await;
            }
            let id = db.tokens.issue_password_recovery_success(address, now)?;
            println!("confirmation: {id}");
        }
        "reset-password-token" => {
            if rest.is_empty() {
                usage_and_exit();
            }
            let password = if let Some(pw) = take_flag_value(&rest[1..], "--password") {
                pw
            } else {
                gen_password()?
            };
            let pid = db.reset_password(&rest[0], &password, now)?;
            println!("pid: {pid}");
            println!("password: {password}");
        }
        _ => usage_and_exit(),
    }

    if dirty || purged > 0 {
        db.save()?;
    }
    Ok(())
}

//! User management command (the access-control realm's user objects).

use std::sync::Arc;

use super::common::Body;
use crate::client::Method;
use crate::context::Context;
use crate::error::CommandError;
use crate::registry::params::UserAction;
use crate::registry::CommandOutput;
use crate::render;

pub(crate) async fn user(
    ctx: &Arc<Context>,
    action: UserAction,
) -> Result<CommandOutput, CommandError> {
    match action {
        UserAction::List => list(ctx).await,
        UserAction::Get { userid } => get(ctx, &userid).await,
        UserAction::Create {
            userid,
            password,
            comment,
            email,
            groups,
            enable,
            expire,
        } => create(ctx, &userid, password, comment, email, groups, enable, expire).await,
        UserAction::Update {
            userid,
            comment,
            email,
            groups,
            enable,
            expire,
        } => update(ctx, &userid, comment, email, groups, enable, expire).await,
        UserAction::Delete { userid } => delete(ctx, &userid).await,
    }
}

async fn list(ctx: &Arc<Context>) -> Result<CommandOutput, CommandError> {
    let reply = ctx.transport.request(Method::Get, "access/users", None).await?;
    let items = render::as_items(&reply);

    let message = render::list_section("Users", &items, "users", |v| {
        let enabled = v.get("enable").and_then(serde_json::Value::as_i64) != Some(0);
        let glyph = if enabled { "🟢" } else { "🔴" };
        let comment = match render::str_field(v, "comment") {
            "-" | "" => String::new(),
            c => format!(" — {c}"),
        };
        format!("{glyph} **{}**{comment}", render::str_field(v, "userid"))
    });
    Ok(CommandOutput::with_data(message, reply))
}

async fn get(ctx: &Arc<Context>, userid: &str) -> Result<CommandOutput, CommandError> {
    let path = format!("access/users/{userid}");
    let reply = ctx.transport.request(Method::Get, &path, None).await?;
    let message = render::detail_block(&format!("User {userid}"), &reply);
    Ok(CommandOutput::with_data(message, reply))
}

#[allow(clippy::too_many_arguments)]
async fn create(
    ctx: &Arc<Context>,
    userid: &str,
    password: Option<String>,
    comment: Option<String>,
    email: Option<String>,
    groups: Vec<String>,
    enable: bool,
    expire: Option<u64>,
) -> Result<CommandOutput, CommandError> {
    let body = Body::new()
        .set("userid", userid)
        .opt("password", password)
        .opt("comment", comment)
        .opt("email", email)
        .opt(
            "groups",
            if groups.is_empty() {
                None
            } else {
                Some(groups.join(","))
            },
        )
        .set("enable", i32::from(enable))
        .opt("expire", expire)
        .build();
    let reply = ctx
        .transport
        .request(Method::Post, "access/users", Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Created user {userid}"),
        reply,
    ))
}

async fn update(
    ctx: &Arc<Context>,
    userid: &str,
    comment: Option<String>,
    email: Option<String>,
    groups: Option<Vec<String>>,
    enable: Option<bool>,
    expire: Option<u64>,
) -> Result<CommandOutput, CommandError> {
    let body = Body::new()
        .opt("comment", comment)
        .opt("email", email)
        .opt("groups", groups.map(|g| g.join(",")))
        .opt("enable", enable.map(i32::from))
        .opt("expire", expire)
        .build();
    let path = format!("access/users/{userid}");
    let reply = ctx
        .transport
        .request(Method::Put, &path, Some(&body))
        .await?;
    Ok(CommandOutput::with_data(
        format!("Updated user {userid}"),
        reply,
    ))
}

async fn delete(ctx: &Arc<Context>, userid: &str) -> Result<CommandOutput, CommandError> {
    let path = format!("access/users/{userid}");
    let reply = ctx.transport.request(Method::Delete, &path, None).await?;
    Ok(CommandOutput::with_data(
        format!("Deleted user {userid}"),
        reply,
    ))
}

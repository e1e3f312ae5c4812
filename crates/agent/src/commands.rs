use anyhow::Result;
use serde_json::Value;

use crate::api_client::{ApiClient, urlencode};

// ── Devices ─────────────────────────────────────────────────────────

pub fn cmd_device_list(client: &ApiClient, username: Option<&str>) -> Result<()> {
    let path = match username {
        Some(name) => format!("/device/list?username={}", urlencode(name)),
        None => "/device/list".to_string(),
    };
    let body = client.get(&path)?;
    let devices: Value = serde_json::from_str(&body)?;

    let Some(rows) = devices.as_array() else {
        println!("{body}");
        return Ok(());
    };
    if rows.is_empty() {
        println!("no devices");
        return Ok(());
    }

    println!("{:<18} {:<20} {:<8} {}", "ADDRESS", "USERNAME", "LOCKED", "AUTHORIZED");
    for row in rows {
        println!(
            "{:<18} {:<20} {:<8} {}",
            row["address"].as_str().unwrap_or("?"),
            row["username"].as_str().unwrap_or("?"),
            row["locked"].as_bool().unwrap_or(false),
            row["authorized"].as_bool().unwrap_or(false),
        );
    }
    Ok(())
}

pub fn cmd_device_delete(client: &ApiClient, username: &str) -> Result<()> {
    client.post_form("/device/delete", &[("username", username)])?;
    println!("deleted all devices for {username}");
    Ok(())
}

pub fn cmd_device_lock(client: &ApiClient, username: &str) -> Result<()> {
    client.post_form("/device/lock", &[("username", username)])?;
    println!("locked {username}");
    Ok(())
}

pub fn cmd_device_unlock(client: &ApiClient, username: &str) -> Result<()> {
    client.post_form("/device/unlock", &[("username", username)])?;
    println!("unlocked {username}");
    Ok(())
}

pub fn cmd_sessions(client: &ApiClient) -> Result<()> {
    print!("{}", client.get("/device/sessions")?);
    Ok(())
}

// ── Firewall ────────────────────────────────────────────────────────

pub fn cmd_firewall_list(client: &ApiClient) -> Result<()> {
    let body = client.get("/firewall/list")?;
    let rules: Value = serde_json::from_str(&body)?;
    println!("{}", serde_json::to_string_pretty(&rules)?);
    Ok(())
}

// ── Config ──────────────────────────────────────────────────────────

pub fn cmd_reload(client: &ApiClient) -> Result<()> {
    client.post_form("/config/reload", &[])?;
    println!("configuration reloaded");
    Ok(())
}

// ── Registrations ───────────────────────────────────────────────────

pub fn cmd_registration_list(client: &ApiClient) -> Result<()> {
    let body = client.get("/registration/list")?;
    let registrations: Value = serde_json::from_str(&body)?;
    let Some(map) = registrations.as_object() else {
        println!("{body}");
        return Ok(());
    };
    if map.is_empty() {
        println!("no pending registrations");
        return Ok(());
    }
    for (token, username) in map {
        println!("{token} {}", username.as_str().unwrap_or("?"));
    }
    Ok(())
}

pub fn cmd_registration_create(
    client: &ApiClient,
    username: &str,
    token: Option<&str>,
) -> Result<()> {
    let body = client.post_form(
        "/registration/create",
        &[("username", username), ("token", token.unwrap_or(""))],
    )?;
    let created: Value = serde_json::from_str(&body)?;
    println!(
        "token {} registered for {}",
        created["Token"].as_str().unwrap_or("?"),
        created["Username"].as_str().unwrap_or("?"),
    );
    Ok(())
}

pub fn cmd_registration_delete(client: &ApiClient, id: &str) -> Result<()> {
    client.post_form("/registration/delete", &[("id", id)])?;
    println!("registration deleted");
    Ok(())
}

// ── Ops ─────────────────────────────────────────────────────────────

pub fn cmd_version(client: &ApiClient, bpf: bool) -> Result<()> {
    let path = if bpf { "/version/bpf" } else { "/version" };
    println!("{}", client.get(path)?.trim_end());
    Ok(())
}

pub fn cmd_shutdown(client: &ApiClient) -> Result<()> {
    println!("{}", client.get("/shutdown")?.trim_end());
    Ok(())
}

pub fn cmd_ebpf_pin(client: &ApiClient) -> Result<()> {
    client.get("/ebpf/pin")?;
    println!("eBPF objects pinned");
    Ok(())
}

pub fn cmd_ebpf_unpin(client: &ApiClient) -> Result<()> {
    client.get("/ebpf/unpin")?;
    println!("eBPF pins removed");
    Ok(())
}

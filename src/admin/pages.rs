//! Minimal admin pages.

use axum::{extract::State, response::Html, Json};
use serde_json::{json, Value};

use crate::http::{ApiError, AppState};
use crate::mail::templates::escape_html;
use crate::security::AdminSession;

fn page(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><h1>{title}</h1>{body}</body></html>"
    ))
}

pub async fn login_page() -> Html<String> {
    page(
        "Admin login",
        "<form id=\"login\">\
         <label>Email <input type=\"email\" name=\"email\" required></label>\
         <label>Password <input type=\"password\" name=\"password\" required></label>\
         <button type=\"submit\">Sign in</button></form>\
         <script>document.getElementById('login').onsubmit=async(e)=>{e.preventDefault();\
         const f=new FormData(e.target);\
         const r=await fetch('/api/auth/login',{method:'POST',headers:{'content-type':'application/json'},\
         body:JSON.stringify({email:f.get('email'),password:f.get('password')})});\
         if(r.ok){location.href='/admin'}else{alert('Invalid credentials')}};</script>",
    )
}

pub async fn dashboard(
    AdminSession(principal): AdminSession,
    State(state): State<AppState>,
) -> Result<Html<String>, ApiError> {
    let items = state.store.list_menu(false).await?;
    let contacts = state.store.list_contacts().await?;

    let body = format!(
        "<p>Signed in as {}</p><ul><li>{} menu items</li><li>{} contact submissions</li></ul>\
         <p><a href=\"/admin/menu/new\">Add a menu item</a></p>",
        escape_html(&principal.email),
        items.len(),
        contacts.len(),
    );
    Ok(page("Dashboard", &body))
}

pub async fn new_menu_item_page(AdminSession(_): AdminSession) -> Html<String> {
    page(
        "New menu item",
        "<p>Send a POST to <code>/api/menu</code> with a name, category and pricing.</p>",
    )
}

/// Stored contact submissions, newest last.
pub async fn list_contacts(
    AdminSession(_): AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let contacts = state.store.list_contacts().await?;
    Ok(Json(json!({ "contacts": contacts })))
}

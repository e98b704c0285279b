//! Account endpoints
//!
//! Login (plain, via a specific identity provider, and for linking another
//! provider), logout, registration, profile completion and the manage page.

use axum::{
    extract::{Host, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::get,
    Form, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use crate::auth::antiforgery::{issue_token, verify_token};
use crate::auth::challenge::sanitize_return_url;
use crate::auth::claims::claim_types;
use crate::auth::oidc_login_api::ChallengeOptions;
use crate::directory::{CreateUserRequest, DirectoryError, REWARDS_NUMBER};
use crate::shared::error::{AppError, Result};
use crate::shared::middleware::{Authenticated, OptionalAuth};
use crate::shared::routes::Route;
use crate::shared::state::AppState;
use crate::shared::views::{
    CompleteProfileView, HtmlTemplate, ManageView, Nav, ProviderLinkState, RegisterThanksView,
    RegisterView,
};

use super::forms::{CompleteProfileForm, FieldErrors, RegisterForm};

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnUrl", alias = "ReturnUrl")]
    pub return_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdpQuery {
    pub idp: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LinkChallengeQuery {
    pub idp: Option<String>,
    pub login_hint: Option<String>,
}

/// GET /Account/Login
pub async fn login(
    State(state): State<AppState>,
    Host(host): Host,
    OptionalAuth(session): OptionalAuth,
    jar: PrivateCookieJar,
    Query(query): Query<LoginQuery>,
) -> Result<Response> {
    let return_url = sanitize_return_url(query.return_url.as_deref());
    if session.is_some() {
        return Ok(Redirect::to(&return_url).into_response());
    }

    let challenge = state
        .sign_in
        .challenge(jar, &host, ChallengeOptions::new(return_url))
        .await?;
    Ok(challenge.into_response())
}

/// GET /Account/LoginWithIdp?idp=
pub async fn login_with_idp(
    State(state): State<AppState>,
    Host(host): Host,
    jar: PrivateCookieJar,
    Query(query): Query<IdpQuery>,
) -> Result<Response> {
    let options = ChallengeOptions::new(Route::Home.path()).with_idp(query.idp);
    let challenge = state.sign_in.challenge(jar, &host, options).await?;
    Ok(challenge.into_response())
}

/// GET /Account/Link?idp=
///
/// Signs out locally and at the provider, then lands on `LinkChallenge`,
/// which signs in again through the requested provider with the current
/// username as login hint.
pub async fn link(
    State(state): State<AppState>,
    Host(host): Host,
    Authenticated(session): Authenticated,
    jar: PrivateCookieJar,
    Query(query): Query<IdpQuery>,
) -> Result<Response> {
    let login_hint = session
        .principal
        .find_first(claim_types::PREFERRED_USERNAME)
        .ok_or_else(|| AppError::missing_claim(claim_types::PREFERRED_USERNAME))?;

    let target = format!(
        "{}?idp={}&login_hint={}",
        Route::LinkChallenge.path(),
        urlencoding::encode(query.idp.as_deref().unwrap_or_default()),
        urlencoding::encode(login_hint)
    );

    info!(user_id = ?session.principal.user_id(), idp = ?query.idp, "Linking identity provider");
    let signed_out = state
        .sign_in
        .sign_out(jar, &host, Some(&session), &target)
        .await?;
    Ok(signed_out.into_response())
}

/// GET /Account/LinkChallenge?idp=&login_hint=
pub async fn link_challenge(
    State(state): State<AppState>,
    Host(host): Host,
    OptionalAuth(session): OptionalAuth,
    jar: PrivateCookieJar,
    Query(query): Query<LinkChallengeQuery>,
) -> Result<Response> {
    if session.is_some() {
        warn!("Link challenge reached while still signed in");
        return Ok(Redirect::to(Route::Home.path()).into_response());
    }

    let options = ChallengeOptions::new(Route::Home.path())
        .with_idp(query.idp)
        .with_login_hint(query.login_hint);
    let challenge = state.sign_in.challenge(jar, &host, options).await?;
    Ok(challenge.into_response())
}

/// GET /Account/Logout
pub async fn logout(
    State(state): State<AppState>,
    Host(host): Host,
    OptionalAuth(session): OptionalAuth,
    jar: PrivateCookieJar,
) -> Result<Response> {
    let Some(session) = session else {
        return Ok(Redirect::to(Route::Home.path()).into_response());
    };

    info!(user_id = ?session.principal.user_id(), "User signing out");
    let signed_out = state
        .sign_in
        .sign_out(jar, &host, Some(&session), Route::Home.path())
        .await?;
    Ok(signed_out.into_response())
}

/// GET /Account/Register
pub async fn register_form(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    jar: PrivateCookieJar,
) -> Response {
    let (jar, antiforgery_token) = issue_token(jar, &state.cookies);
    let view = RegisterView {
        nav: Nav::for_principal(session.as_ref().map(|s| &s.principal)),
        fields: Default::default(),
        errors: FieldErrors::default(),
        error: None,
        antiforgery_token,
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// POST /Account/Register
pub async fn register(
    State(state): State<AppState>,
    OptionalAuth(session): OptionalAuth,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    verify_token(&jar, &state.cookies, &form.request_verification_token)?;
    let form = form.normalized();
    let nav = Nav::for_principal(session.as_ref().map(|s| &s.principal));

    if let Err(errors) = form.validate() {
        return Ok(render_register(&state, jar, nav, &form, FieldErrors::from(&errors), None));
    }

    let request = CreateUserRequest::with_password(form.to_profile(), form.password.clone());
    match state.directory.create_user(request, true).await {
        Ok(user) => {
            info!(user_id = %user.id, "Registered user");
            Ok(Redirect::to(Route::RegisterThanks.path()).into_response())
        }
        Err(err) => {
            let summary = rejection_summary(err)?;
            Ok(render_register(&state, jar, nav, &form, FieldErrors::default(), Some(summary)))
        }
    }
}

fn render_register(
    state: &AppState,
    jar: PrivateCookieJar,
    nav: Nav,
    form: &RegisterForm,
    errors: FieldErrors,
    error: Option<String>,
) -> Response {
    let (jar, antiforgery_token) = issue_token(jar, &state.cookies);
    let view = RegisterView {
        nav,
        fields: form.fields(),
        errors,
        error,
        antiforgery_token,
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// GET /Account/RegisterThanks
pub async fn register_thanks(OptionalAuth(session): OptionalAuth) -> HtmlTemplate<RegisterThanksView> {
    HtmlTemplate(RegisterThanksView {
        nav: Nav::for_principal(session.as_ref().map(|s| &s.principal)),
    })
}

/// GET /Account/CompleteProfile
pub async fn complete_profile_form(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    jar: PrivateCookieJar,
) -> Result<Response> {
    if state.policy.is_complete(&session.principal).await? {
        return Ok(Redirect::to(Route::Home.path()).into_response());
    }

    Ok(render_complete_profile(
        &state,
        jar,
        Nav::for_principal(Some(&session.principal)),
        String::new(),
        FieldErrors::default(),
        None,
    ))
}

/// POST /Account/CompleteProfile
pub async fn complete_profile(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    jar: PrivateCookieJar,
    Form(form): Form<CompleteProfileForm>,
) -> Result<Response> {
    verify_token(&jar, &state.cookies, &form.request_verification_token)?;
    let form = form.normalized();
    let nav = Nav::for_principal(Some(&session.principal));

    if state.policy.is_complete(&session.principal).await? {
        return Ok(Redirect::to(Route::Home.path()).into_response());
    }

    if let Err(errors) = form.validate() {
        return Ok(render_complete_profile(
            &state,
            jar,
            nav,
            form.rewards_number,
            FieldErrors::from(&errors),
            None,
        ));
    }

    let user_id = session
        .principal
        .user_id()
        .ok_or_else(|| AppError::missing_claim(claim_types::SUBJECT))?;

    let saved = async {
        let mut user = state.directory.get_user(user_id).await?;
        user.profile
            .set_attribute(REWARDS_NUMBER, form.rewards_number.clone());
        state.directory.update_user_profile(user_id, &user.profile).await
    }
    .await;

    match saved {
        Ok(_) => {
            info!(user_id, "Profile completed");
            let mut principal = session.principal.clone();
            principal.set_claim(claim_types::REWARDS_NUMBER, form.rewards_number.clone());
            let jar = state.sign_in.refresh_session(jar, &session, principal)?;
            Ok((jar, Redirect::to(Route::Home.path())).into_response())
        }
        Err(err) => {
            let summary = rejection_summary(err)?;
            Ok(render_complete_profile(
                &state,
                jar,
                nav,
                form.rewards_number,
                FieldErrors::default(),
                Some(summary),
            ))
        }
    }
}

fn render_complete_profile(
    state: &AppState,
    jar: PrivateCookieJar,
    nav: Nav,
    rewards_number: String,
    errors: FieldErrors,
    error: Option<String>,
) -> Response {
    let (jar, antiforgery_token) = issue_token(jar, &state.cookies);
    let view = CompleteProfileView {
        nav,
        rewards_number,
        errors,
        error,
        antiforgery_token,
    };
    (jar, HtmlTemplate(view)).into_response()
}

/// GET /Account/Manage
pub async fn manage(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> Result<HtmlTemplate<ManageView>> {
    let user_id = session
        .principal
        .user_id()
        .ok_or_else(|| AppError::missing_claim(claim_types::SUBJECT))?;

    let user = state.directory.get_user(user_id).await?;
    let linked = state.directory.list_identity_providers(&user.id).await?;

    let providers = state
        .social_providers
        .iter()
        .map(|provider| ProviderLinkState {
            name: provider.name.clone(),
            idp_id: provider.idp_id.clone(),
            linked: linked.iter().any(|idp| idp.is_kind(&provider.kind)),
        })
        .collect();

    Ok(HtmlTemplate(ManageView {
        nav: Nav::for_principal(Some(&session.principal)),
        email: user.profile.email.clone(),
        rewards_number: user
            .profile
            .rewards_number()
            .filter(|v| !v.is_empty())
            .map(String::from),
        linked,
        providers,
    }))
}

/// The directory's error summary when it rejected the request; any other
/// failure becomes an error page.
fn rejection_summary(err: DirectoryError) -> Result<String> {
    match err.error_summary() {
        Some(summary) => {
            warn!(error = %err, "Directory rejected the request");
            Ok(summary.to_string())
        }
        None => Err(err.into()),
    }
}

/// Account routes
pub fn account_router() -> Router<AppState> {
    Router::new()
        .route(Route::Login.path(), get(login))
        .route(Route::LoginWithIdp.path(), get(login_with_idp))
        .route(Route::Link.path(), get(link))
        .route(Route::LinkChallenge.path(), get(link_challenge))
        .route(Route::Logout.path(), get(logout))
        .route(Route::Register.path(), get(register_form).post(register))
        .route(Route::RegisterThanks.path(), get(register_thanks))
        .route(
            Route::CompleteProfile.path(),
            get(complete_profile_form).post(complete_profile),
        )
        .route(Route::Manage.path(), get(manage))
}

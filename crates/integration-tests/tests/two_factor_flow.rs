//! Login flow tests: password step, TOTP step, and enrollment through a
//! password change.

#![allow(clippy::unwrap_used)]

use std::time::SystemTime;

use sqlx::PgPool;

use bookshelf_core::UserId;
use bookshelf_integration_tests::{NEW_PASSWORD, PASSWORD, two_factor};
use bookshelf_storefront::models::{AuthState, RequestContext};
use bookshelf_storefront::services::auth::{AuthError, AuthService, LoginStep, PasswordChange};
use bookshelf_storefront::services::two_factor::{TotpSecret, TwoFactor};

const EMAIL: &str = "reader@example.com";

async fn reader_with_secret(auth: &AuthService<'_>) -> (UserId, TotpSecret) {
    let id = auth.register("Reader", EMAIL, PASSWORD).await.unwrap();
    let secret = TwoFactor::generate_secret();
    auth.set_two_factor_secret(id, Some(&secret)).await.unwrap();
    (id, secret)
}

/// A six-digit code that differs from the current one in its last digit.
fn wrong_code(tf: &TwoFactor, secret: &TotpSecret) -> String {
    let mut code = tf.code_at(secret, SystemTime::now()).unwrap();
    let last = code.pop().and_then(|c| c.to_digit(10)).unwrap();
    code.push(char::from_digit((last + 5) % 10, 10).unwrap());
    code
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn login_without_two_factor_authenticates(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let id = auth.register("Reader", EMAIL, PASSWORD).await.unwrap();

    let mut ctx = RequestContext::anonymous();
    let step = auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();

    assert_eq!(step, LoginStep::Authenticated);
    assert_eq!(ctx.current_user().map(|u| u.id), Some(id));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn failed_login_leaves_context_untouched(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    auth.register("Reader", EMAIL, PASSWORD).await.unwrap();

    let mut ctx = RequestContext::anonymous();
    let err = auth.login(&mut ctx, EMAIL, NEW_PASSWORD).await.unwrap_err();

    assert!(matches!(err, AuthError::UnknownUser));
    assert_eq!(ctx, RequestContext::anonymous());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn login_with_two_factor_needs_a_valid_code(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let (id, secret) = reader_with_secret(&auth).await;

    let mut ctx = RequestContext::anonymous();
    let step = auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();
    assert_eq!(step, LoginStep::SecondFactorRequired);
    assert!(!ctx.is_authenticated());
    assert_eq!(ctx.pending_user().map(|u| u.id), Some(id));

    // A wrong code can be retried.
    let err = auth
        .verify_second_factor(&mut ctx, &wrong_code(&tf, &secret), SystemTime::now())
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::InvalidTwoFactorCode));
    assert_eq!(ctx.pending_user().map(|u| u.id), Some(id));

    let now = SystemTime::now();
    let code = tf.code_at(&secret, now).unwrap();
    auth.verify_second_factor(&mut ctx, &code, now)
        .await
        .expect("Valid code should be accepted");
    assert_eq!(ctx.current_user().map(|u| u.id), Some(id));
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn malformed_codes_are_rejected(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    reader_with_secret(&auth).await;

    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();

    for code in ["", "12345", "1234567", "12a456", " 123456"] {
        assert!(
            matches!(
                auth.verify_second_factor(&mut ctx, code, SystemTime::now())
                    .await,
                Err(AuthError::InvalidTwoFactorCode)
            ),
            "{code:?}"
        );
    }
    assert!(ctx.pending_user().is_some());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn second_factor_requires_pending_state(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let (_, secret) = reader_with_secret(&auth).await;
    let code = tf.code_at(&secret, SystemTime::now()).unwrap();

    let mut ctx = RequestContext::anonymous();
    assert!(matches!(
        auth.verify_second_factor(&mut ctx, &code, SystemTime::now())
            .await,
        Err(AuthError::InvalidSessionState)
    ));
    assert_eq!(ctx.auth, AuthState::Anonymous);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn secret_cleared_while_pending_resets_context(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let (id, secret) = reader_with_secret(&auth).await;

    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();
    auth.set_two_factor_secret(id, None).await.unwrap();

    let code = tf.code_at(&secret, SystemTime::now()).unwrap();
    assert!(matches!(
        auth.verify_second_factor(&mut ctx, &code, SystemTime::now())
            .await,
        Err(AuthError::TwoFactorNotConfigured)
    ));
    assert_eq!(ctx.auth, AuthState::Anonymous);
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn enrollment_requires_login(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);

    let mut ctx = RequestContext::anonymous();
    assert!(matches!(
        auth.begin_enrollment(&mut ctx),
        Err(AuthError::InvalidSessionState)
    ));
    assert!(ctx.enrollment_secret.is_none());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn enrolling_through_password_change(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let id = auth.register("Reader", EMAIL, PASSWORD).await.unwrap();

    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();

    let enrollment = auth.begin_enrollment(&mut ctx).unwrap();
    assert!(
        enrollment
            .provisioning_uri
            .starts_with("otpauth://totp/Bookshelf:reader%40example.com?")
    );
    assert!(
        enrollment
            .provisioning_uri
            .contains(enrollment.secret.as_base32())
    );
    // Nothing is stored until the password change opts in.
    assert!(!auth.two_factor_enabled(id).await.unwrap());

    auth.submit_password_change(&mut ctx, PasswordChange {
        old_password: PASSWORD,
        new_password: NEW_PASSWORD,
        enable_two_factor: true,
    })
    .await
    .expect("Failed to change password");

    assert!(ctx.enrollment_secret.is_none());
    assert_eq!(
        auth.two_factor_secret(id).await.unwrap().as_base32(),
        enrollment.secret.as_base32()
    );

    // The next login asks for a code from the enrolled secret.
    ctx.logout();
    let step = auth.login(&mut ctx, EMAIL, NEW_PASSWORD).await.unwrap();
    assert_eq!(step, LoginStep::SecondFactorRequired);
    let now = SystemTime::now();
    let code = tf.code_at(&enrollment.secret, now).unwrap();
    auth.verify_second_factor(&mut ctx, &code, now)
        .await
        .unwrap();
    assert!(ctx.is_authenticated());
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn opting_in_without_enrollment_changes_nothing(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let id = auth.register("Reader", EMAIL, PASSWORD).await.unwrap();

    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();

    let err = auth
        .submit_password_change(&mut ctx, PasswordChange {
            old_password: PASSWORD,
            new_password: NEW_PASSWORD,
            enable_two_factor: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::TwoFactorNotConfigured));

    assert!(!auth.two_factor_enabled(id).await.unwrap());
    auth.authenticate(EMAIL, PASSWORD).await.unwrap();
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn failed_password_change_does_not_store_secret(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let id = auth.register("Reader", EMAIL, PASSWORD).await.unwrap();

    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();
    auth.begin_enrollment(&mut ctx).unwrap();

    let err = auth
        .submit_password_change(&mut ctx, PasswordChange {
            old_password: PASSWORD,
            new_password: "too weak",
            enable_two_factor: true,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword(_)));

    assert!(!auth.two_factor_enabled(id).await.unwrap());
    assert!(ctx.enrollment_secret.is_some());
    auth.authenticate(EMAIL, PASSWORD).await.unwrap();
}

#[sqlx::test(migrations = "../storefront/migrations")]
#[ignore = "Requires PostgreSQL (DATABASE_URL)"]
async fn opting_out_clears_stored_secret(pool: PgPool) {
    let tf = two_factor();
    let auth = AuthService::new(&pool, &tf);
    let (id, secret) = reader_with_secret(&auth).await;

    let mut ctx = RequestContext::anonymous();
    auth.login(&mut ctx, EMAIL, PASSWORD).await.unwrap();
    let now = SystemTime::now();
    let code = tf.code_at(&secret, now).unwrap();
    auth.verify_second_factor(&mut ctx, &code, now)
        .await
        .unwrap();

    auth.submit_password_change(&mut ctx, PasswordChange {
        old_password: PASSWORD,
        new_password: NEW_PASSWORD,
        enable_two_factor: false,
    })
    .await
    .unwrap();

    assert!(!auth.two_factor_enabled(id).await.unwrap());
    ctx.logout();
    assert_eq!(
        auth.login(&mut ctx, EMAIL, NEW_PASSWORD).await.unwrap(),
        LoginStep::Authenticated
    );
}

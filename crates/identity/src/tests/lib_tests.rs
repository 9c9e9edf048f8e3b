use super::*;

fn config() -> TokenConfig {
    TokenConfig {
        secret: "s".into(),
        ttl_seconds: 60,
    }
}

#[test]
fn minted_token_verifies_to_the_same_identity() {
    let cfg = config();
    let token = mint_token(&cfg, &Identity::new("alice")).expect("mint");
    let identity = verify_token(&cfg, &token).expect("verify");
    assert_eq!(identity, Identity::new("alice"));
}

#[test]
fn token_signed_with_another_secret_is_rejected() {
    let token = mint_token(
        &TokenConfig {
            secret: "other".into(),
            ttl_seconds: 60,
        },
        &Identity::new("alice"),
    )
    .expect("mint");
    assert!(matches!(
        verify_token(&config(), &token),
        Err(TokenError::Invalid(_))
    ));
}

#[test]
fn expired_token_is_rejected() {
    let cfg = TokenConfig {
        secret: "s".into(),
        ttl_seconds: -3600,
    };
    let token = mint_token(&cfg, &Identity::new("alice")).expect("mint");
    assert!(verify_token(&cfg, &token).is_err());
}

#[test]
fn authorization_header_requires_bearer_scheme() {
    let cfg = config();
    let token = mint_token(&cfg, &Identity::new("bob")).expect("mint");

    let identity =
        identity_from_authorization(&cfg, Some(&format!("Bearer {token}"))).expect("bearer");
    assert_eq!(identity.as_str(), "bob");

    assert!(matches!(
        identity_from_authorization(&cfg, None),
        Err(TokenError::Missing)
    ));
    assert!(matches!(
        identity_from_authorization(&cfg, Some(&format!("Basic {token}"))),
        Err(TokenError::Missing)
    ));
}

#[test]
fn blank_identity_cannot_be_minted() {
    assert!(matches!(
        mint_token(&config(), &Identity::new(" ")),
        Err(TokenError::EmptyIdentity)
    ));
}

//! Router selection across the four registered adapters.

mod common;

use std::sync::Arc;

use common::{MockChain, MockWallet};
use solana_sdk::pubkey::Pubkey;
use veilkit_mpc::X25519KeyPair;
use veilkit_providers::{
    ArciumAdapter, MockCircuitBackend, NoirAdapter, PrivacyCashAdapter, PrivacyLevel,
    PrivacyProvider, ProviderError, ProviderId, ProviderRouter, SelectionCriteria,
    ShadowWireAdapter,
};
use veilkit_providers::adapters::shadowwire::ShadowWireAdapterConfig;

async fn full_router() -> ProviderRouter {
    let chain = MockChain::new();
    let wallet: Arc<MockWallet> = Arc::new(MockWallet::new());

    let shadowwire = Arc::new(ShadowWireAdapter::new(ShadowWireAdapterConfig {
        base_url: "http://127.0.0.1:9".into(),
        ..ShadowWireAdapterConfig::default()
    }));
    let arcium = Arc::new(ArciumAdapter::new(
        Pubkey::new_unique(),
        X25519KeyPair::generate().public,
    ));
    let pool = Arc::new(PrivacyCashAdapter::new(
        Pubkey::new_unique(),
        None,
        Arc::new(MockCircuitBackend),
    ));
    let noir = Arc::new(NoirAdapter::new(
        Pubkey::new_unique(),
        Arc::new(MockCircuitBackend),
    ));

    for adapter in [
        shadowwire.clone() as Arc<dyn PrivacyProvider>,
        arcium.clone(),
        pool.clone(),
        noir.clone(),
    ] {
        adapter
            .initialize(chain.clone(), Some(wallet.clone()))
            .await
            .unwrap();
    }

    let mut router = ProviderRouter::new();
    router.register(shadowwire);
    router.register(arcium);
    router.register(pool);
    router.register(noir);
    router
}

fn criteria(level: PrivacyLevel, token: &str, amount: f64) -> SelectionCriteria {
    SelectionCriteria {
        privacy_level: level,
        token: token.to_string(),
        amount,
        max_fee: None,
        max_latency_ms: None,
        require_compliance: false,
        preferred_provider: None,
    }
}

#[tokio::test]
async fn test_amount_hidden_usdc_prefers_cheaper_mpc() {
    let router = full_router().await;

    let mut request = criteria(PrivacyLevel::AmountHidden, "USDC", 100.0);
    request.max_fee = Some(2.0);
    let result = router.select_provider(&request).await.unwrap();

    // Only ShadowWire (fee 1.0) and Arcium (fee 0.2) support amount-hidden
    // USDC; the cheaper MPC backend wins
    assert_eq!(result.recommended.provider, ProviderId::Arcium);
    assert_eq!(result.alternatives.len(), 1);
    assert_eq!(result.alternatives[0].provider, ProviderId::ShadowWire);

    assert!((result.recommended.estimate.fee - 0.2).abs() < 1e-9);
    assert!(result
        .explanation
        .iter()
        .any(|r| r == "supports amount-hidden"));
    assert!(result.explanation.iter().any(|r| r == "supports USDC"));
    assert!(result.explanation.iter().any(|r| r.starts_with("fee ")));
    assert!(result.explanation.iter().any(|r| r.starts_with("latency ")));
}

#[tokio::test]
async fn test_recommended_is_always_registered() {
    let router = full_router().await;
    for (level, token, amount) in [
        (PrivacyLevel::AmountHidden, "SOL", 1.0),
        (PrivacyLevel::Shielded, "USDC", 50.0),
        (PrivacyLevel::Anonymous, "SOL", 0.5),
    ] {
        let result = router
            .select_provider(&criteria(level, token, amount))
            .await
            .unwrap();
        assert!(router.get(result.recommended.provider).is_some());
    }
}

#[tokio::test]
async fn test_no_suitable_provider_lists_every_adapter() {
    let router = full_router().await;

    // No adapter supports transparent BONK
    let err = router
        .select_provider(&criteria(PrivacyLevel::Transparent, "BONK", 1.0))
        .await
        .unwrap_err();
    match err {
        ProviderError::NoSuitableProvider(reasons) => {
            assert_eq!(reasons.len(), 4);
            let providers: Vec<ProviderId> = reasons.iter().map(|r| r.provider).collect();
            assert!(providers.contains(&ProviderId::ShadowWire));
            assert!(providers.contains(&ProviderId::Noir));
        }
        other => panic!("expected NoSuitableProvider, got {other}"),
    }
}

#[tokio::test]
async fn test_max_fee_excludes_all() {
    let router = full_router().await;

    let mut request = criteria(PrivacyLevel::AmountHidden, "USDC", 100.0);
    request.max_fee = Some(0.01);
    let err = router.select_provider(&request).await.unwrap_err();
    match err {
        ProviderError::NoSuitableProvider(reasons) => {
            assert!(reasons
                .iter()
                .any(|r| r.reason.contains("exceeds max")));
        }
        other => panic!("expected NoSuitableProvider, got {other}"),
    }
}

#[tokio::test]
async fn test_below_minimum_amount_is_excluded() {
    let router = full_router().await;

    // 0.4 USDC is under every amount-hidden provider's minimum
    let err = router
        .select_provider(&criteria(PrivacyLevel::AmountHidden, "USDC", 0.4))
        .await
        .unwrap_err();
    match err {
        ProviderError::NoSuitableProvider(reasons) => {
            assert!(reasons.iter().any(|r| r.reason.contains("minimum")));
        }
        other => panic!("expected NoSuitableProvider, got {other}"),
    }
}

#[tokio::test]
async fn test_preferred_provider_bonus_in_explanation() {
    let router = full_router().await;

    let mut request = criteria(PrivacyLevel::AmountHidden, "USDC", 100.0);
    request.preferred_provider = Some(ProviderId::Arcium);
    let result = router.select_provider(&request).await.unwrap();
    assert_eq!(result.recommended.provider, ProviderId::Arcium);
    assert!(result
        .explanation
        .iter()
        .any(|r| r == "preferred provider"));
}

#[tokio::test]
async fn test_compliance_requirement_favors_relayer() {
    let router = full_router().await;

    // With equal-enough scores, the compliance bonus should surface in the
    // relayer's reasons when it is selected or ranked
    let mut request = criteria(PrivacyLevel::AmountHidden, "USDC", 100.0);
    request.require_compliance = true;
    let result = router.select_provider(&request).await.unwrap();

    let shadowwire = std::iter::once(&result.recommended)
        .chain(result.alternatives.iter())
        .find(|c| c.provider == ProviderId::ShadowWire)
        .expect("shadowwire should be a candidate");
    assert!(shadowwire.reasons.iter().any(|r| r == "compliance supported"));
}

#[tokio::test]
async fn test_alternatives_sorted_by_score() {
    let router = full_router().await;

    let result = router
        .select_provider(&criteria(PrivacyLevel::Shielded, "SOL", 1.0))
        .await
        .unwrap();
    let mut last = result.recommended.score;
    for alt in &result.alternatives {
        assert!(alt.score <= last);
        last = alt.score;
    }
}

#[tokio::test]
async fn test_unready_adapter_is_excluded_with_reason() {
    // A router whose only adapter was never initialized
    let mut router = ProviderRouter::new();
    router.register(Arc::new(ShadowWireAdapter::new(
        ShadowWireAdapterConfig::default(),
    )));

    let err = router
        .select_provider(&criteria(PrivacyLevel::AmountHidden, "USDC", 100.0))
        .await
        .unwrap_err();
    match err {
        ProviderError::NoSuitableProvider(reasons) => {
            assert_eq!(reasons.len(), 1);
            assert!(reasons[0].reason.contains("not available"));
        }
        other => panic!("expected NoSuitableProvider, got {other}"),
    }
}

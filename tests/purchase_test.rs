//! Purchase flow integration tests: paid rejection, pricing fallback and
//! its interaction with re-login.

mod common;

use common::*;
use storenet::plist::Dictionary;
use storenet::{PurchaseFailure, Software, StoreError};

fn free_app() -> Software {
    let mut app = Software::new(389801252);
    app.version_id = Some(857_396_144);
    app
}

fn ok() -> Dictionary {
    let mut dict = Dictionary::new();
    dict.insert("jingleDocType", "purchaseSuccess");
    dict.insert("status", 0_i64);
    dict
}

fn pricing_of(transport: &ScriptedTransport) -> Vec<String> {
    transport
        .requests()
        .iter()
        .filter(|r| r.path.ends_with("/buyProduct"))
        .map(|r| body_of(r).get_str("pricingParameter").unwrap_or_default().to_string())
        .collect()
}

#[tokio::test]
async fn test_paid_item_makes_no_requests() {
    let transport = ScriptedTransport::new();
    let mut app = free_app();
    app.price = 0.99;

    let err = client(&transport)
        .purchase(&signed_in_account(), &app)
        .await
        .unwrap_err();

    assert_eq!(err, StoreError::purchase(PurchaseFailure::PaidNotSupported));
    assert_eq!(transport.request_count(), 0);
}

#[tokio::test]
async fn test_standard_purchase() {
    let transport = ScriptedTransport::new();
    transport.push(plist_response_with_headers(
        &ok(),
        &[("set-cookie", "wosid=abc; Path=/")],
    ));

    let result = client(&transport)
        .purchase(&signed_in_account(), &free_app())
        .await
        .unwrap();

    assert_eq!(result.updated_cookies.get("wosid"), Some("abc"));
    assert_eq!(result.updated_cookies.get("itspod"), Some("25"));
    assert!(result.updated_account.is_none());

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.host, "p25-buy.itunes.apple.com");
    assert_eq!(req.path, "/WebObjects/MZFinance.woa/wa/buyProduct");
    assert_eq!(req.header_value("iCloud-DSID"), req.header_value("X-Dsid"));

    let body = body_of(req);
    assert_eq!(body.get("appExtVrsId").and_then(|v| v.as_integer()), Some(857_396_144));
    assert_eq!(body.get_str("buyWithoutAuthorization"), Some("true"));
    assert_eq!(body.get_str("guid"), Some(DEVICE_ID));
    assert_eq!(body.get_str("hasAskedToFulfillPreorder"), Some("true"));
    assert_eq!(body.get_str("needDiv"), Some("0"));
    assert_eq!(body.get_str("origPage"), Some("SoftwarePage"));
    assert_eq!(body.get_str("price"), Some("0"));
    assert_eq!(body.get_str("pricingParameter"), Some("STDQ"));
    assert_eq!(body.get_str("productType"), Some("C"));
    assert_eq!(body.get("salableAdamId").and_then(|v| v.as_integer()), Some(389801252));
}

#[tokio::test]
async fn test_wrong_pricing_falls_back_to_game() {
    let transport = ScriptedTransport::new();
    transport.push(plist_response(&failure("2059", None)));
    transport.push(plist_response(&ok()));

    let result = client(&transport)
        .purchase(&signed_in_account(), &free_app())
        .await;

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(pricing_of(&transport), vec!["STDQ", "GAME"]);
}

#[tokio::test]
async fn test_fallback_has_no_third_attempt() {
    let transport = ScriptedTransport::new();
    transport.push(plist_response(&failure("2059", None)));
    transport.push(plist_response(&failure("2059", None)));
    transport.push(plist_response(&ok()));

    let err = client(&transport)
        .purchase(&signed_in_account(), &free_app())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Purchase {
            reason: PurchaseFailure::WrongPricingParameter,
            ..
        }
    ));
    assert_eq!(transport.request_count(), 2);
    assert_eq!(transport.remaining(), 1);
}

#[tokio::test]
async fn test_other_failures_skip_fallback() {
    let transport = ScriptedTransport::new();
    transport.push(plist_response(&failure("9610", None)));

    let err = client(&transport)
        .purchase(&signed_in_account(), &free_app())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Purchase {
            reason: PurchaseFailure::SubscriptionRequired,
            ..
        }
    ));
    assert_eq!(pricing_of(&transport), vec!["STDQ"]);
}

#[tokio::test]
async fn test_generic_failure_carries_code() {
    let transport = ScriptedTransport::new();
    transport.push(plist_response(&failure("3001", None)));

    let err = client(&transport)
        .purchase(&signed_in_account(), &free_app())
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("3001"));
    assert_eq!(err.to_string(), "Purchase failed: purchase failed (code 3001)");
}

#[tokio::test]
async fn test_expiry_reruns_whole_fallback_from_standard() {
    let transport = ScriptedTransport::new();
    transport.push(plist_response(&failure("2059", None)));
    transport.push(plist_response(&failure("2034", None)));
    transport.push(auth_response("2000", "new-token"));
    transport.push(plist_response(&ok()));

    let result = client(&transport)
        .purchase(&signed_in_account(), &free_app())
        .await
        .unwrap();

    assert_eq!(pricing_of(&transport), vec!["STDQ", "GAME", "STDQ"]);
    assert_eq!(transport.request_count(), 4);

    let refreshed = result.updated_account.unwrap();
    assert_eq!(refreshed.password_token, "new-token");
    assert_eq!(refreshed.device_identifier, DEVICE_ID);

    // The retry runs with the refreshed identity
    let last = transport.requests().pop().unwrap();
    assert_eq!(last.header_value("X-Dsid"), Some("2000"));
    assert_eq!(last.header_value("iCloud-DSID"), Some("2000"));
}

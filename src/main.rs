use clap::Parser;
use colis_checkout::core::wizard::TIMEOUT_REASON;
use colis_checkout::core::ConfigProvider;
use colis_checkout::domain::model::PriceBreakdown;
use colis_checkout::utils::error::{CheckoutError, ErrorSeverity};
use colis_checkout::utils::validation::{self, Validate};
use colis_checkout::utils::logger;
use colis_checkout::{
    CheckoutConfig, CheckoutSession, CliArgs, HttpPaymentGateway, LocalReceiptStore, ReceiptView,
    TrackingNumberCode, WizardAction, WizardPhase,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting colis-checkout");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Checkout failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(args: &CliArgs) -> colis_checkout::Result<()> {
    let config = CheckoutConfig::from_file(&args.config)?;

    // 驗證配置
    config.validate()?;

    let form = validation::validate_required_field("shipment", &config.shipment)?.clone();

    let gateway = Arc::new(HttpPaymentGateway::from_config(&config)?);
    let mut session =
        CheckoutSession::new(config.build_wizard()?, gateway, config.poll_settings()).with_form(form);
    tracing::info!("🧮 Pricing with {}", session.wizard().pricing().name());

    while let WizardPhase::Collecting(step) = session.state().phase().clone() {
        let state = session.dispatch(WizardAction::Next)?;
        if !state.errors().is_empty() {
            print_errors(&format!("Étape {} ({})", step.index(), step), state.errors());
            return Err(CheckoutError::ConfigValidationError {
                field: "shipment".to_string(),
                message: format!("step '{}' is incomplete", step),
            });
        }
    }

    let price = session
        .state()
        .price()
        .cloned()
        .ok_or_else(|| CheckoutError::ConfigError {
            message: "no price was computed for the review step".to_string(),
        })?;
    print_quote(&price);

    if args.quote_only {
        return Ok(());
    }

    let state = session.dispatch(WizardAction::Confirm)?;
    if !state.errors().is_empty() {
        print_errors("Récapitulatif", state.errors());
        return Err(CheckoutError::ConfigValidationError {
            field: "shipment.options".to_string(),
            message: "review step rejected the shipment".to_string(),
        });
    }

    let method = args
        .method
        .or(config.payment.as_ref().map(|p| p.method))
        .ok_or_else(|| CheckoutError::MissingConfigError {
            field: "payment.method".to_string(),
        })?;
    let phone = args
        .phone
        .clone()
        .or(config.payment.as_ref().map(|p| p.phone.clone()))
        .ok_or_else(|| CheckoutError::MissingConfigError {
            field: "payment.phone".to_string(),
        })?;

    let state = session.submit_payment(method, &phone).await?;
    if !state.errors().is_empty() {
        print_errors("Paiement", state.errors());
        return Err(CheckoutError::MissingConfigError {
            field: "payment.phone".to_string(),
        });
    }
    if let Some(message) = state.payment_error() {
        return Err(CheckoutError::PaymentFailed {
            reason: message.to_string(),
        });
    }
    if let (WizardPhase::PaymentPending, Some(pending)) = (state.phase(), state.pending()) {
        println!(
            "📲 Confirmez le paiement {} sur votre téléphone (colis {})",
            method,
            pending.tracking_number()
        );
    }

    let state = if session.state().phase() == &WizardPhase::PaymentPending {
        let waited = tokio::select! {
            state = async { session.wait_for_confirmation().await.map(|s| s.clone()) } => Some(state),
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(state) = waited else {
            tracing::warn!("Interrupted while waiting for payment confirmation");
            session.abandon();
            return Ok(());
        };
        state?
    } else {
        // 付款在發起時即已確定
        session.state().clone()
    };

    match state.phase() {
        WizardPhase::Confirmed => {}
        WizardPhase::Failed(reason) if reason == TIMEOUT_REASON => {
            return Err(CheckoutError::PaymentTimeout {
                seconds: config.payment_timeout().map_or(0, |t| t.as_secs()),
            });
        }
        WizardPhase::Failed(reason) => {
            return Err(CheckoutError::PaymentFailed {
                reason: reason.clone(),
            });
        }
        other => {
            return Err(CheckoutError::InvalidTransition {
                phase: other.to_string(),
                action: "render_receipt".to_string(),
            });
        }
    }

    let Some(result) = state.result() else {
        return Err(CheckoutError::InvalidTransition {
            phase: state.phase().to_string(),
            action: "render_receipt".to_string(),
        });
    };

    let view = ReceiptView::new(result, state.price(), &TrackingNumberCode);
    println!("✅ Paiement confirmé !");
    println!("{}", view.render_text());

    let store = LocalReceiptStore::new(config.receipt_output_path().to_string());
    let location = view.download(&store).await?;
    println!("📁 Reçu enregistré: {}", location);
    println!("🔎 Suivi: {}", view.tracking_path());

    Ok(())
}

fn print_quote(price: &PriceBreakdown) {
    println!("💰 Tarif ({})", price.strategy);
    println!("   Prix de base : {} FCFA", price.base_price);
    println!("   Poids        : {} FCFA ({} kg)", price.weight_charge, price.chargeable_weight_kg);
    println!("   Zone         : {} FCFA", price.zone_charge);
    println!("   Service      : {} FCFA", price.service_charge);
    println!("   Options      : {} FCFA", price.options_charge);
    println!("   Assurance    : {} FCFA", price.insurance);
    println!("   Total        : {} FCFA", price.total);
    println!("   Livraison estimée: {} jour(s)", price.estimated_delivery_days);
}

fn print_errors(context: &str, errors: &[String]) {
    eprintln!("❌ {} incomplète:", context);
    for error in errors {
        eprintln!("   - {}", error);
    }
}

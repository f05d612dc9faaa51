use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::user::get_profile,
        handlers::user::update_profile,
        handlers::user::change_password,
        handlers::user::get_wallet,
        handlers::user::get_virtual_accounts,
        handlers::user::get_crypto_wallet,
        handlers::user::get_transactions,
        handlers::user::get_state,
        handlers::catalog::get_types,
        handlers::catalog::get_countries,
        handlers::catalog::get_services,
        handlers::catalog::get_saved,
        handlers::catalog::toggle_saved,
        handlers::rental::list_rentals,
        handlers::rental::book_rental,
        handlers::rental::close_rental,
        handlers::rental::reactivate_rental,
        handlers::rental::open_view,
        handlers::rental::get_view,
        handlers::rental::close_view,
        handlers::rental::reload_codes,
        handlers::shop::list_accounts,
        handlers::shop::get_account,
        handlers::shop::purchase,
        handlers::shop::get_orders,
        handlers::shop::get_order,
        handlers::referral::get_stats,
        handlers::referral::get_referrals,
        handlers::referral::get_settings,
        handlers::referral::update_settings,
        handlers::referral::transfer,
        handlers::deposit::initiate_deposit,
        handlers::deposit::validate_deposit,
    ),
    components(
        schemas(
            Stage,
            UserProfile,
            LoginRequest,
            RegisterRequest,
            AuthResponse,
            UpdateProfileRequest,
            ChangePasswordRequest,
            AppStateResponse,
            Wallet,
            VirtualAccount,
            CryptoWallet,
            TransactionKind,
            WalletTransaction,
            InitiateDepositRequest,
            InitiateDepositResponse,
            ValidateDepositRequest,
            ValidateDepositResponse,
            NumberType,
            Country,
            ServiceOffer,
            ServiceQuery,
            CountryQuery,
            ToggleSavedRequest,
            SavedServicesResponse,
            RentalKind,
            RentalStatus,
            Rental,
            VerificationMessage,
            BookRentalRequest,
            CloseRentalRequest,
            RentalListResponse,
            ReactivateResponse,
            CountdownPhase,
            RentalViewSnapshot,
            AccountListing,
            ShopQuery,
            PurchaseRequest,
            PurchaseResponse,
            Order,
            OrderLogin,
            OrderDetail,
            ReferralStats,
            Referral,
            ReferralSettings,
            TransferRequest,
            TransferResponse,
            PaginationParams,
            PaginationInfo,
            ApiError,
            ErrorResponse,
            MessageResponse,
        )
    ),
    tags(
        (name = "auth", description = "Login session"),
        (name = "user", description = "Profile, wallet and app state"),
        (name = "catalog", description = "Number/email types, countries and services"),
        (name = "rentals", description = "Number and email rentals, countdown and codes"),
        (name = "shop", description = "Account marketplace"),
        (name = "referral", description = "Referral programme"),
        (name = "deposit", description = "Wallet funding"),
    ),
    info(
        title = "DSpice Client API",
        version = "0.1.0",
        description = "Local companion service for the DSpice rental marketplace",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        cart::{AddToCartRequest, CartItemDto, CartList},
        checkout::CompleteCheckoutRequest,
        notifications::NotificationList,
        orders::{
            AdHocLine, AdHocOrderRequest, InventoryAdjustRequest, OrderList, OrderWithItems,
            ShipOrderRequest, UpdateStatusRequest,
        },
    },
    models::{CartItem, Notification, Order, OrderItem, OrderStatus, Product, User},
    payment::CreditCard,
    response::{ApiResponse, Meta},
    routes::{cart, checkout, fulfillment, health, notifications, orders, params},
    services::inventory_service::ProductList,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_quantity,
        cart::remove_from_cart,
        cart::clear_cart,
        orders::list_orders,
        orders::place_ad_hoc_order,
        orders::get_order,
        checkout::complete_checkout,
        fulfillment::update_order_status,
        fulfillment::ship_order,
        fulfillment::list_low_stock,
        fulfillment::adjust_inventory,
        notifications::list_notifications,
        notifications::mark_read
    ),
    components(
        schemas(
            User,
            Product,
            CartItem,
            Order,
            OrderItem,
            OrderStatus,
            Notification,
            CreditCard,
            AddToCartRequest,
            CartItemDto,
            CartList,
            AdHocLine,
            AdHocOrderRequest,
            UpdateStatusRequest,
            ShipOrderRequest,
            InventoryAdjustRequest,
            CompleteCheckoutRequest,
            OrderList,
            OrderWithItems,
            NotificationList,
            ProductList,
            params::Pagination,
            params::OrderListQuery,
            params::LowStockQuery,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<CartList>,
            ApiResponse<NotificationList>,
            ApiResponse<ProductList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Order endpoints"),
        (name = "Checkout", description = "Checkout endpoints"),
        (name = "Fulfillment", description = "Seller/admin fulfillment endpoints"),
        (name = "Notifications", description = "In-app notification endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

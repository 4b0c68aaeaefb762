//! Static record-shape descriptors.
//!
//! Both export lineages run through the same ingest and refresh code; a
//! [`RecordShape`] tells that code which source fields feed which target
//! columns and which tables hold the results.

use crate::FileType;

/// Post-processing applied to a raw field value before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    None,
    /// `YYYY-MM-DD HH:MM` from an ISO-8601 timestamp.
    Minute,
    /// `YYYY-MM-DD` from an ISO-8601 timestamp.
    Day,
    /// Last six characters.
    Suffix6,
    /// Kept only when the value is made of digits and dots.
    NumericOnly,
}

/// How the insert statement binds a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlKind {
    Text,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    Field(&'static str),
    /// First non-empty field among vendor renames of the same column.
    FirstOf(&'static [&'static str]),
    Tenant,
    FileId,
    CompartmentPath,
    Tags,
    /// Zero-based special tag slot.
    TagSpecial(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub source: ColumnSource,
    pub transform: Transform,
    pub kind: SqlKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagLayout {
    /// One source column per tag, named `<prefix><key>`.
    PrefixedColumns(&'static str),
    /// A single source column holding a JSON object of tags.
    JsonObject(&'static str),
}

/// Where the minimum-date filter reads a file's date from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileDateRule {
    CreatedMinute,
    PathSegments,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Column {
        ref_type: &'static str,
        column: &'static str,
    },
    /// Stores the text before the first `" /"` of a compartment path.
    TopLevelPath {
        ref_type: &'static str,
        column: &'static str,
    },
    /// Stores `"<sku> <min(description)>"` per SKU.
    SkuWithDescription { ref_type: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tables {
    pub raw: &'static str,
    pub stats: &'static str,
    pub reference: &'static str,
    pub tag_keys: &'static str,
    pub load_status: &'static str,
    pub rate_card: &'static str,
}

impl Tables {
    pub fn all(&self) -> [&'static str; 6] {
        [
            self.raw,
            self.stats,
            self.reference,
            self.tag_keys,
            self.load_status,
            self.rate_card,
        ]
    }
}

/// Target columns the refresh statements group, sum and rank on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    pub tenant: &'static str,
    pub file_id: &'static str,
    pub period_start: &'static str,
    pub stats_cost: &'static str,
    pub stats_cost_overage: Option<&'static str>,
    pub currency: &'static str,
    pub sku: &'static str,
    pub description: &'static str,
    pub billing_unit: Option<&'static str>,
    pub rate_cost: &'static str,
    pub rate_quantity: &'static str,
    pub list_unit_price: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordShape {
    pub file_type: FileType,
    /// Object-name prefix listed in the bucket.
    pub prefix: &'static str,
    pub tables: Tables,
    pub columns: &'static [Column],
    pub tag_layout: TagLayout,
    pub compartment_field: &'static str,
    pub roles: Roles,
    pub dimensions: &'static [Dimension],
    pub special_key_types: [&'static str; 4],
    /// Reference type whose values are registered as tenant ids.
    pub tenant_id_ref_type: Option<&'static str>,
    pub file_date: FileDateRule,
}

impl RecordShape {
    pub fn for_type(file_type: FileType) -> &'static RecordShape {
        match file_type {
            FileType::Cost => &COST_SHAPE,
            FileType::Focus => &FOCUS_SHAPE,
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }
}

const fn text(name: &'static str, field: &'static str) -> Column {
    Column {
        name,
        source: ColumnSource::Field(field),
        transform: Transform::None,
        kind: SqlKind::Text,
    }
}

const fn num(name: &'static str, field: &'static str) -> Column {
    Column {
        name,
        source: ColumnSource::Field(field),
        transform: Transform::None,
        kind: SqlKind::Number,
    }
}

const fn shaped(name: &'static str, field: &'static str, transform: Transform) -> Column {
    Column {
        name,
        source: ColumnSource::Field(field),
        transform,
        kind: SqlKind::Text,
    }
}

const fn derived(name: &'static str, source: ColumnSource) -> Column {
    Column {
        name,
        source,
        transform: Transform::None,
        kind: SqlKind::Text,
    }
}

const COST_COLUMNS: &[Column] = &[
    derived("tenant_name", ColumnSource::Tenant),
    derived("file_id", ColumnSource::FileId),
    shaped("usage_interval_start", "lineItem/intervalUsageStart", Transform::Minute),
    shaped("usage_interval_end", "lineItem/intervalUsageEnd", Transform::Minute),
    text("prd_service", "product/service"),
    text("prd_compartment_id", "product/compartmentId"),
    text("prd_compartment_name", "product/compartmentName"),
    derived("prd_compartment_path", ColumnSource::CompartmentPath),
    text("prd_region", "product/region"),
    text("prd_availability_domain", "product/availabilityDomain"),
    text("usg_resource_id", "product/resourceId"),
    num("usg_billed_quantity", "usage/billedQuantity"),
    num("usg_billed_quantity_overage", "usage/billedQuantityOverage"),
    shaped("cost_subscription_id", "cost/subscriptionId", Transform::NumericOnly),
    text("cost_product_sku", "cost/productSku"),
    text("prd_description", "product/Description"),
    num("cost_unit_price", "cost/unitPrice"),
    num("cost_unit_price_overage", "cost/unitPriceOverage"),
    num("cost_my_cost", "cost/myCost"),
    num("cost_my_cost_overage", "cost/myCostOverage"),
    num("cost_attributed_cost", "cost/attributedCost"),
    num("usg_attributed_usage", "usage/attributedUsage"),
    text("cost_currency_code", "cost/currencyCode"),
    derived(
        "cost_billing_unit",
        ColumnSource::FirstOf(&["cost/skuUnitDescription", "cost/billingUnitReadable"]),
    ),
    text("cost_overage_flag", "cost/overageFlag"),
    text("is_correction", "lineItem/isCorrection"),
    derived("tags_data", ColumnSource::Tags),
    shaped("tenant_id", "lineItem/tenantId", Transform::Suffix6),
    derived("tag_special1", ColumnSource::TagSpecial(0)),
    derived("tag_special2", ColumnSource::TagSpecial(1)),
    derived("tag_special3", ColumnSource::TagSpecial(2)),
    derived("tag_special4", ColumnSource::TagSpecial(3)),
];

const FOCUS_COLUMNS: &[Column] = &[
    derived("source_tenant_name", ColumnSource::Tenant),
    derived("source_file_id", ColumnSource::FileId),
    text("billing_account_id", "BillingAccountId"),
    text("billing_account_name", "BillingAccountName"),
    text("billing_account_type", "BillingAccountType"),
    text("sub_account_id", "SubAccountId"),
    text("sub_account_name", "SubAccountName"),
    text("sub_account_type", "SubAccountType"),
    text("invoice_id", "InvoiceId"),
    text("invoice_issuer", "InvoiceIssuer"),
    text("provider", "Provider"),
    text("publisher", "Publisher"),
    text("pricing_category", "PricingCategory"),
    num("pricing_currency_contracted_up", "PricingCurrencyContractedUnitPrice"),
    Column {
        name: "pricing_currency_effective_cost",
        source: ColumnSource::FirstOf(&[
            "PricingCurrencyEffectiveCost",
            "PricingCurrencyEffectiveCost ",
        ]),
        transform: Transform::None,
        kind: SqlKind::Number,
    },
    num("pricing_currency_list_unit_price", "PricingCurrencyListUnitPrice"),
    num("pricing_quantity", "PricingQuantity"),
    text("pricing_unit", "PricingUnit"),
    shaped("billing_period_start", "BillingPeriodStart", Transform::Day),
    shaped("billing_period_end", "BillingPeriodEnd", Transform::Day),
    shaped("charge_period_start", "ChargePeriodStart", Transform::Minute),
    shaped("charge_period_end", "ChargePeriodEnd", Transform::Minute),
    num("billed_cost", "BilledCost"),
    text("billing_currency", "BillingCurrency"),
    num("consumed_quantity", "ConsumedQuantity"),
    text("consumed_unit", "ConsumedUnit"),
    num("contracted_cost", "ContractedCost"),
    num("contracted_unit_price", "ContractedUnitPrice"),
    num("effective_cost", "EffectiveCost"),
    num("list_cost", "ListCost"),
    num("list_unit_price", "ListUnitPrice"),
    text("availability_zone", "AvailabilityZone"),
    derived("region_id", ColumnSource::FirstOf(&["Region", "RegionId"])),
    text("region_name", "RegionName"),
    text("resource_id", "ResourceId"),
    text("resource_name", "ResourceName"),
    text("resource_type", "ResourceType"),
    derived("tags", ColumnSource::Tags),
    text("service_category", "ServiceCategory"),
    text("service_sub_category", "ServiceSubCategory"),
    text("service_name", "ServiceName"),
    text("capacity_reservation_id", "CapacityReservationId"),
    text("capacity_reservation_status", "CapacityReservationStatus"),
    text("charge_category", "ChargeCategory"),
    text("charge_class", "ChargeClass"),
    text("charge_description", "ChargeDescription"),
    text("charge_frequency", "ChargeFrequency"),
    text("commitment_discount_category", "CommitmentDiscountCategory"),
    text("commitment_discount_id", "CommitmentDiscountId"),
    text("commitment_discount_name", "CommitmentDiscountName"),
    num("commitment_discount_quantity", "CommitmentDiscountQuantity"),
    text("commitment_discount_status", "CommitmentDiscountStatus"),
    text("commitment_discount_type", "CommitmentDiscountType"),
    text("commitment_discount_unit", "CommitmentDiscountUnit"),
    text("sku_id", "SkuId"),
    text("sku_price_id", "SkuPriceId"),
    text("sku_price_details", "SkuPriceDetails"),
    text("sku_meter", "SkuMeter"),
    num("usage_quantity", "UsageQuantity"),
    text("usage_unit", "UsageUnit"),
    text("oci_reference_number", "oci_ReferenceNumber"),
    text("oci_compartment_id", "oci_CompartmentId"),
    text("oci_compartment_name", "oci_CompartmentName"),
    derived("oci_compartment_path", ColumnSource::CompartmentPath),
    text("oci_overage_flag", "oci_OverageFlag"),
    num("oci_unit_price_overage", "oci_UnitPriceOverage"),
    num("oci_billed_quantity_overage", "oci_BilledQuantityOverage"),
    num("oci_cost_overage", "oci_CostOverage"),
    num("oci_attributed_usage", "oci_AttributedUsage"),
    num("oci_attributed_cost", "oci_AttributedCost"),
    text("oci_back_reference_number", "oci_BackReferenceNumber"),
    derived("tag_special1", ColumnSource::TagSpecial(0)),
    derived("tag_special2", ColumnSource::TagSpecial(1)),
    derived("tag_special3", ColumnSource::TagSpecial(2)),
    derived("tag_special4", ColumnSource::TagSpecial(3)),
];

/// Detailed cost-and-usage report (`reports/cost-csv/*.csv.gz`).
pub static COST_SHAPE: RecordShape = RecordShape {
    file_type: FileType::Cost,
    prefix: "reports/cost-csv/",
    tables: Tables {
        raw: "oci_cost",
        stats: "oci_cost_stats",
        reference: "oci_cost_reference",
        tag_keys: "oci_cost_tag_keys",
        load_status: "oci_load_status",
        rate_card: "oci_price_list",
    },
    columns: COST_COLUMNS,
    tag_layout: TagLayout::PrefixedColumns("tags/"),
    compartment_field: "product/compartmentId",
    roles: Roles {
        tenant: "tenant_name",
        file_id: "file_id",
        period_start: "usage_interval_start",
        stats_cost: "cost_my_cost",
        stats_cost_overage: Some("cost_my_cost_overage"),
        currency: "cost_currency_code",
        sku: "cost_product_sku",
        description: "prd_description",
        billing_unit: Some("cost_billing_unit"),
        rate_cost: "cost_my_cost",
        rate_quantity: "usg_billed_quantity",
        list_unit_price: None,
    },
    dimensions: &[
        Dimension::Column {
            ref_type: "PRD_SERVICE",
            column: "prd_service",
        },
        Dimension::TopLevelPath {
            ref_type: "PRD_COMPARTMENT_PATH",
            column: "prd_compartment_path",
        },
        Dimension::Column {
            ref_type: "TENANT_ID",
            column: "tenant_id",
        },
        Dimension::Column {
            ref_type: "PRD_COMPARTMENT_NAME",
            column: "prd_compartment_name",
        },
        Dimension::Column {
            ref_type: "PRD_REGION",
            column: "prd_region",
        },
        Dimension::Column {
            ref_type: "COST_SUBSCRIPTION_ID",
            column: "cost_subscription_id",
        },
        Dimension::Column {
            ref_type: "TAG_SPECIAL",
            column: "tag_special1",
        },
        Dimension::Column {
            ref_type: "TAG_SPECIAL2",
            column: "tag_special2",
        },
        Dimension::Column {
            ref_type: "TAG_SPECIAL3",
            column: "tag_special3",
        },
        Dimension::Column {
            ref_type: "TAG_SPECIAL4",
            column: "tag_special4",
        },
        Dimension::SkuWithDescription {
            ref_type: "COST_PRODUCT_SKU",
        },
    ],
    special_key_types: [
        "TAG_SPECIAL_KEY",
        "TAG_SPECIAL_KEY2",
        "TAG_SPECIAL_KEY3",
        "TAG_SPECIAL_KEY4",
    ],
    tenant_id_ref_type: Some("TENANT_ID"),
    file_date: FileDateRule::CreatedMinute,
};

/// FOCUS 1.0 cost report (`FOCUS Reports/yyyy/mm/dd/*.csv.gz`).
pub static FOCUS_SHAPE: RecordShape = RecordShape {
    file_type: FileType::Focus,
    prefix: "FOCUS Reports/",
    tables: Tables {
        raw: "oci_focus",
        stats: "oci_focus_stats",
        reference: "oci_focus_reference",
        tag_keys: "oci_focus_tag_keys",
        load_status: "oci_focus_load_status",
        rate_card: "oci_focus_rate_card",
    },
    columns: FOCUS_COLUMNS,
    tag_layout: TagLayout::JsonObject("Tags"),
    compartment_field: "oci_CompartmentId",
    roles: Roles {
        tenant: "source_tenant_name",
        file_id: "source_file_id",
        period_start: "charge_period_start",
        stats_cost: "effective_cost",
        stats_cost_overage: Some("oci_cost_overage"),
        currency: "billing_currency",
        sku: "sku_id",
        description: "charge_description",
        billing_unit: Some("pricing_unit"),
        rate_cost: "billed_cost",
        rate_quantity: "usage_quantity",
        list_unit_price: Some("list_unit_price"),
    },
    dimensions: &[
        Dimension::TopLevelPath {
            ref_type: "oci_Compartment_Path",
            column: "oci_compartment_path",
        },
        Dimension::Column {
            ref_type: "Sub_Account_Id",
            column: "sub_account_id",
        },
        Dimension::Column {
            ref_type: "oci_Compartment_Name",
            column: "oci_compartment_name",
        },
        Dimension::Column {
            ref_type: "Region_Id",
            column: "region_id",
        },
        Dimension::Column {
            ref_type: "Billing_Account_Id",
            column: "billing_account_id",
        },
        Dimension::Column {
            ref_type: "Resource_Type",
            column: "resource_type",
        },
        Dimension::Column {
            ref_type: "Service_Category",
            column: "service_category",
        },
        Dimension::Column {
            ref_type: "Service_Name",
            column: "service_name",
        },
        Dimension::Column {
            ref_type: "Tag_Special1",
            column: "tag_special1",
        },
        Dimension::Column {
            ref_type: "Tag_Special2",
            column: "tag_special2",
        },
        Dimension::Column {
            ref_type: "Tag_Special3",
            column: "tag_special3",
        },
        Dimension::Column {
            ref_type: "Tag_Special4",
            column: "tag_special4",
        },
        Dimension::SkuWithDescription { ref_type: "Sku_Id" },
    ],
    special_key_types: [
        "TAG_SPECIAL_KEY1",
        "TAG_SPECIAL_KEY2",
        "TAG_SPECIAL_KEY3",
        "TAG_SPECIAL_KEY4",
    ],
    tenant_id_ref_type: None,
    file_date: FileDateRule::PathSegments,
};

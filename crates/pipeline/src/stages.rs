use crate::placeholder::PlaceholderGenerator;
use registry::CaseCategory;
use serde::{Deserialize, Serialize};

/// Id of the final stage of every pipeline; finishing it drafts the email.
pub const COMMUNICATION_STAGE: &str = "communication";

#[derive(Clone, Copy)]
pub enum Completion {
    Fixed(&'static str),
    Generated(fn(&mut PlaceholderGenerator) -> String),
}

impl Completion {
    /// Render the completion text; generated templates draw fresh values on
    /// every call.
    pub fn render(&self, generator: &mut PlaceholderGenerator) -> String {
        match self {
            Completion::Fixed(text) => text.to_string(),
            Completion::Generated(template) => template(generator),
        }
    }
}

#[derive(Clone, Copy)]
pub struct StageDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
    pub running: &'static str,
    pub completion: Completion,
}

/// Pipeline variant, selected once per run from the case category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineKind {
    Fulfillment,
    Logistics,
}

impl PipelineKind {
    pub fn for_category(category: CaseCategory) -> Self {
        match category {
            CaseCategory::Logistics => PipelineKind::Logistics,
            CaseCategory::Atp | CaseCategory::Pricing | CaseCategory::Unknown => {
                PipelineKind::Fulfillment
            }
        }
    }

    pub fn stages(&self) -> &'static [StageDescriptor] {
        match self {
            PipelineKind::Fulfillment => &FULFILLMENT_STAGES,
            PipelineKind::Logistics => &LOGISTICS_STAGES,
        }
    }

    pub fn position(&self, stage_id: &str) -> Option<usize> {
        self.stages().iter().position(|s| s.id == stage_id)
    }
}

const COMMUNICATION_ICON: &str = "✉️";
const COMMUNICATION_LABEL: &str = "Communication Agent";

static FULFILLMENT_STAGES: [StageDescriptor; 6] = [
    StageDescriptor {
        id: "start",
        label: "Start",
        icon: "▶",
        running: "Initializing agentic pipeline...",
        completion: Completion::Fixed("Pipeline initialized. Ready to process invoice."),
    },
    StageDescriptor {
        id: "advanced",
        label: "Advanced Extraction",
        icon: "🔍",
        running: "Running advanced OCR extraction on invoice document...",
        completion: Completion::Generated(advanced_extracted),
    },
    StageDescriptor {
        id: "reasoning",
        label: "Reasoning Extraction",
        icon: "🧠",
        running: "Applying reasoning agent to extract structured data...",
        completion: Completion::Generated(reasoning_extracted),
    },
    StageDescriptor {
        id: "combination",
        label: "Combination Agent",
        icon: "🔗",
        running: "Merging extraction results and resolving inconsistencies...",
        completion: Completion::Fixed(
            "Merged extraction results. Resolved 2 inconsistencies in product IDs and pricing. Final structured data ready.",
        ),
    },
    StageDescriptor {
        id: "supplyDb",
        label: "Query Supply DB",
        icon: "💾",
        running: "Querying ATP database for inventory status and promise dates...",
        completion: Completion::Fixed(
            "ATP database queried. Retrieved inventory status across 3 plants. Calculated promise dates and availability windows.",
        ),
    },
    StageDescriptor {
        id: COMMUNICATION_STAGE,
        label: COMMUNICATION_LABEL,
        icon: COMMUNICATION_ICON,
        running: "Drafting vendor communication based on ATP status...",
        completion: Completion::Fixed(
            "Email draft generated with ATP status, promise dates, and recommended actions for vendor review.",
        ),
    },
];

static LOGISTICS_STAGES: [StageDescriptor; 14] = [
    StageDescriptor {
        id: "stage0",
        label: "File Ingestion Agent",
        icon: "📁",
        running: "Validating file MIME type and creating job ID...",
        completion: Completion::Generated(file_validated),
    },
    StageDescriptor {
        id: "stage1",
        label: "Document Classification Agent",
        icon: "📋",
        running: "Classifying document type (Sales Order, Purchase Order, Logistics Invoice, etc.)...",
        completion: Completion::Generated(document_classified),
    },
    StageDescriptor {
        id: "stage2",
        label: "OCR + Vision Extraction Agent",
        icon: "👁️",
        running: "Running OCR and vision extraction on all pages...",
        completion: Completion::Generated(ocr_completed),
    },
    StageDescriptor {
        id: "stage3",
        label: "Layout Reconstruction Agent",
        icon: "🏗️",
        running: "Reconstructing document layout and structure...",
        completion: Completion::Fixed(
            "Layout reconstructed. Rebuilt grids (Bill To / Ship To), line-item tables, and multi-column layouts. OCR misalignments corrected.",
        ),
    },
    StageDescriptor {
        id: "stage4",
        label: "Key-Value Extraction Agent",
        icon: "🔑",
        running: "Extracting key-value pairs (Customer PO, Order Date, Buyer name, etc.)...",
        completion: Completion::Generated(key_values_extracted),
    },
    StageDescriptor {
        id: "stage5",
        label: "Line-Item Table Extraction Agent",
        icon: "📊",
        running: "Extracting line-item tables with product codes and quantities...",
        completion: Completion::Generated(line_items_extracted),
    },
    StageDescriptor {
        id: "stage6",
        label: "Logistics Intelligence Agent",
        icon: "🧠",
        running: "Analyzing logistics intelligence (delivery dates, delays, customs issues)...",
        completion: Completion::Generated(logistics_events),
    },
    StageDescriptor {
        id: "stage7",
        label: "Validation + Cross-Checking Agent",
        icon: "✅",
        running: "Validating extracted data and cross-checking for accuracy...",
        completion: Completion::Fixed(
            "Validation complete. Address validated, date logic verified, totals checked. All anomalies flagged and resolved.",
        ),
    },
    StageDescriptor {
        id: "stage8",
        label: "Business Rules Agent",
        icon: "⚖️",
        running: "Applying business rules and domain logic...",
        completion: Completion::Generated(business_rules_applied),
    },
    StageDescriptor {
        id: "stage9",
        label: "Entity Normalization Agent",
        icon: "🔄",
        running: "Normalizing entities (company names, addresses, product codes)...",
        completion: Completion::Fixed(
            "Entities normalized. Company names standardized, addresses cleaned into components, product names standardized for database integration.",
        ),
    },
    StageDescriptor {
        id: "stage10",
        label: "Master JSON Assembly Agent",
        icon: "📦",
        running: "Assembling master JSON from all extraction stages...",
        completion: Completion::Fixed(
            "Master JSON assembled. All stages merged into canonical schema. Missing fields inferred. Final structured record created.",
        ),
    },
    StageDescriptor {
        id: "stage11",
        label: "Domain Knowledge Agent",
        icon: "🎓",
        running: "Adding domain knowledge (industry tags, hazmat flags, customs flags)...",
        completion: Completion::Generated(domain_knowledge_added),
    },
    StageDescriptor {
        id: "stage12",
        label: "Integration Agent",
        icon: "🔌",
        running: "Pushing to ECM, ERP, or DMS systems (SAP, Oracle, Dynamics 365)...",
        completion: Completion::Generated(integration_complete),
    },
    StageDescriptor {
        id: COMMUNICATION_STAGE,
        label: COMMUNICATION_LABEL,
        icon: COMMUNICATION_ICON,
        running: "Drafting communication for concerned parties based on logistics status...",
        completion: Completion::Fixed(
            "Email draft generated with logistics status, delivery dates, and recommended actions for concerned parties.",
        ),
    },
];

fn advanced_extracted(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Successfully extracted {} fields including order IDs, product details, quantities, and pricing information.",
        g.count(20, 15)
    )
}

fn reasoning_extracted(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Identified {} key entities and relationships. Validated data consistency across document sections.",
        g.count(8, 5)
    )
}

fn file_validated(g: &mut PlaceholderGenerator) -> String {
    format!(
        "File validated ({}). Job ID created. File stored in blob storage.",
        g.pick(&["PDF", "Image-PDF", "Scan"])
    )
}

fn document_classified(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Document classified as {} with 98% confidence.",
        g.pick(&["Logistics Invoice", "Bill of Lading", "Delivery Note", "Sales Order Form"])
    )
}

fn ocr_completed(g: &mut PlaceholderGenerator) -> String {
    let pages = g.count(1, 3);
    let boxes = g.count(30, 20);
    let tables = g.count(2, 3);
    format!(
        "OCR completed on {} pages. Extracted {} text boxes, {} tables, and mapped bounding boxes.",
        pages, boxes, tables
    )
}

fn key_values_extracted(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Extracted {} key-value pairs including Customer PO, Order Date, Buyer name, Shipping method, and Payment terms. Normalized phone numbers and dates.",
        g.count(20, 15)
    )
}

fn line_items_extracted(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Extracted {} line items with product codes, quantities, and totals. Normalized product codes and captured multi-line comments.",
        g.count(2, 3)
    )
}

fn logistics_events(g: &mut PlaceholderGenerator) -> String {
    let events = g.count(1, 2);
    let flags = g.count(1, 2);
    let keyword = g.pick(&["customs_delay", "staggered_delivery", "inventory_shortage"]);
    format!(
        "Identified {} logistics events, {} risk flags. Tagged with keywords: {}.",
        events, flags, keyword
    )
}

fn business_rules_applied(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Applied business rules. Detected {}. Status and risk levels assigned.",
        g.pick(&[
            "Partial shipment",
            "Customs documentation incomplete",
            "B2B chemical order",
        ])
    )
}

fn domain_knowledge_added(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Domain knowledge added. Industry classified as {}. Hazmat and customs flags applied.",
        g.pick(&["Chemical", "Manufacturing", "Industrial"])
    )
}

fn integration_complete(g: &mut PlaceholderGenerator) -> String {
    format!(
        "Integration complete. Data pushed to {}. Confirmation received with row identifiers.",
        g.pick(&["SAP", "Oracle SCM", "Dynamics 365", "Kagen Enterprise DMS"])
    )
}

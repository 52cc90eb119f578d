// src/services/receipt_service.rs

use chrono::{DateTime, Utc};
use genpdf::{Element, elements, style};
use image::Luma;
use qrcode::QrCode;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{auth::User, delivery::Delivery, receipt::DeliveryReceipt},
};

#[derive(Clone)]
pub struct ReceiptService;

impl ReceiptService {
    pub fn new() -> Self {
        Self
    }

    // Monta o comprovante imutável a partir da entrega finalizada.
    //
    // Nunca falha por timestamp ausente: uma entrega finalizada por
    // override administrativo pode não ter passado por
    // `pickup_confirmed`, e nesse caso a duração correspondente sai
    // como None em vez de derrubar a finalização.
    pub fn build(&self, delivery: &Delivery, lojista: &User, motoboy: &User) -> DeliveryReceipt {
        let delivered_at = delivery.delivered_at.unwrap_or_else(Utc::now);

        DeliveryReceipt {
            id: Uuid::new_v4(),
            delivery_id: delivery.id,
            loja_id: lojista.id,
            motoboy_id: motoboy.id,
            loja_name: lojista.name.clone(),
            motoboy_name: motoboy.name.clone(),
            recipient_info: delivery.recipient_info.clone(),
            product_description: delivery.product_description.clone(),
            pickup_address: delivery.pickup_address.clone(),
            delivery_address: delivery.delivery_address.clone(),
            matched_at: delivery.matched_at,
            pickup_confirmed_at: delivery.pickup_confirmed_at,
            delivered_at,
            matched_to_pickup_minutes: minutes_between(
                delivery.matched_at,
                delivery.pickup_confirmed_at,
            ),
            pickup_to_delivery_minutes: minutes_between(
                delivery.pickup_confirmed_at,
                Some(delivered_at),
            ),
            distance_km: delivery.distance_km,
            base_price: delivery.base_price,
            distance_fee: delivery.distance_fee,
            waiting_fee: delivery.waiting_fee,
            platform_fee: delivery.platform_fee,
            total_price: delivery.total_price,
            motoboy_earnings: delivery.motoboy_earnings,
            created_at: Utc::now(),
        }
    }

    // Renderiza o comprovante em PDF, com QR code de verificação.
    pub fn render_pdf(&self, receipt: &DeliveryReceipt) -> Result<Vec<u8>, AppError> {
        // Carrega a fonte da pasta 'fonts/'
        let font_family = genpdf::fonts::from_files("./fonts", "Roboto", None)
            .map_err(|_| AppError::FontNotFound("Fonte não encontrada na pasta ./fonts".to_string()))?;

        let mut doc = genpdf::Document::new(font_family);
        doc.set_title(format!("Comprovante de Entrega #{}", receipt.id));
        let mut decorator = genpdf::SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        // --- CABEÇALHO ---
        doc.push(
            elements::Paragraph::new("SRBOY - COMPROVANTE DE ENTREGA")
                .styled(style::Style::new().bold().with_font_size(18)),
        );
        doc.push(
            elements::Paragraph::new(format!("Entrega: {}", receipt.delivery_id))
                .styled(style::Style::new().with_font_size(10)),
        );
        doc.push(elements::Paragraph::new(format!(
            "Finalizada em: {}",
            receipt.delivered_at.format("%d/%m/%Y %H:%M")
        )));

        doc.push(elements::Break::new(1.5));

        // --- PARTES ---
        doc.push(elements::Paragraph::new(format!("Loja: {}", receipt.loja_name)));
        doc.push(elements::Paragraph::new(format!(
            "Motoboy: {}",
            receipt.motoboy_name
        )));
        doc.push(elements::Paragraph::new(format!(
            "Destinatário: {} (doc. {})",
            receipt.recipient_info.name, receipt.recipient_info.document
        )));
        doc.push(elements::Paragraph::new(format!(
            "Coleta: {} - {}",
            receipt.pickup_address.address, receipt.pickup_address.city
        )));
        doc.push(elements::Paragraph::new(format!(
            "Entrega: {} - {}",
            receipt.delivery_address.address, receipt.delivery_address.city
        )));

        if let Some(minutos) = receipt.pickup_to_delivery_minutes {
            doc.push(elements::Paragraph::new(format!(
                "Tempo entre coleta e entrega: {} min",
                minutos
            )));
        }

        doc.push(elements::Break::new(2));

        // --- TABELA DE VALORES ---
        let mut table = elements::TableLayout::new(vec![3, 2]);
        table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

        let style_bold = style::Style::new().bold();
        table
            .row()
            .element(elements::Paragraph::new("Item").styled(style_bold))
            .element(elements::Paragraph::new("Valor").styled(style_bold))
            .push()
            .expect("Table error");

        let linhas = [
            ("Preço base", receipt.base_price),
            ("Frete por distância", receipt.distance_fee),
            ("Taxa de espera", receipt.waiting_fee),
            ("Taxa da plataforma", receipt.platform_fee),
            ("Repasse ao motoboy", receipt.motoboy_earnings),
        ];
        for (rotulo, valor) in linhas {
            table
                .row()
                .element(elements::Paragraph::new(rotulo))
                .element(elements::Paragraph::new(format!("R$ {:.2}", valor)))
                .push()
                .expect("Table row error");
        }

        doc.push(table);
        doc.push(elements::Break::new(1));

        let mut total_paragraph =
            elements::Paragraph::new(format!("TOTAL: R$ {:.2}", receipt.total_price));
        total_paragraph.set_alignment(genpdf::Alignment::Right);
        doc.push(total_paragraph.styled(style::Style::new().bold().with_font_size(12)));

        doc.push(elements::Break::new(2));

        // --- QR DE VERIFICAÇÃO ---
        // O QR carrega o id do comprovante; a conferência é feita na
        // consulta do comprovante pela API.
        let code = QrCode::new(receipt.id.to_string().as_bytes())
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        let image_buffer = code.render::<Luma<u8>>().build();
        let dynamic_image = image::DynamicImage::ImageLuma8(image_buffer);

        let pdf_image = genpdf::elements::Image::from_dynamic_image(dynamic_image)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?
            .with_scale(genpdf::Scale::new(0.5, 0.5));

        doc.push(pdf_image);

        // Renderiza para buffer em memória
        let mut buffer = Vec::new();
        doc.render(&mut buffer)
            .map_err(|e| AppError::InternalServerError(anyhow::Error::msg(e.to_string())))?;

        Ok(buffer)
    }
}

fn minutes_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_minutes()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::UserType;
    use crate::models::delivery::DeliveryStatus;
    use chrono::Duration;
    use rust_decimal::Decimal;

    fn user(name: &str, user_type: UserType) -> User {
        let agora = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: format!("{name}@srboy.com"),
            name: name.to_string(),
            user_type,
            base_city: Some("São Roque".to_string()),
            ranking_score: 100,
            total_deliveries: 0,
            is_available: true,
            wallet_balance: Decimal::ZERO,
            created_at: agora,
            updated_at: agora,
        }
    }

    #[test]
    fn receipt_carries_both_durations_on_the_normal_flow() {
        let agora = Utc::now();
        let mut entrega = Delivery::fixture(DeliveryStatus::Delivered);
        entrega.matched_at = Some(agora - Duration::minutes(45));
        entrega.pickup_confirmed_at = Some(agora - Duration::minutes(30));
        entrega.delivered_at = Some(agora);

        let comprovante = ReceiptService::new().build(
            &entrega,
            &user("Mercado Central", UserType::Lojista),
            &user("Carlos", UserType::Motoboy),
        );

        assert_eq!(comprovante.matched_to_pickup_minutes, Some(15));
        assert_eq!(comprovante.pickup_to_delivery_minutes, Some(30));
        assert_eq!(comprovante.delivery_id, entrega.id);
        assert_eq!(comprovante.total_price, entrega.total_price);
    }

    // Uma entrega forçada para `delivered` por override administrativo
    // pode nunca ter confirmado a coleta. O comprovante sai mesmo assim,
    // com as durações omitidas.
    #[test]
    fn missing_pickup_timestamp_omits_durations_instead_of_failing() {
        let mut entrega = Delivery::fixture(DeliveryStatus::Delivered);
        entrega.pickup_confirmed_at = None;
        entrega.delivered_at = Some(Utc::now());

        let comprovante = ReceiptService::new().build(
            &entrega,
            &user("Mercado Central", UserType::Lojista),
            &user("Carlos", UserType::Motoboy),
        );

        assert_eq!(comprovante.matched_to_pickup_minutes, None);
        assert_eq!(comprovante.pickup_to_delivery_minutes, None);
    }

    // Caminho feliz completo, do matching ao comprovante, com a trava
    // de PIN barrando a finalização precoce no meio do caminho.
    #[test]
    fn full_happy_path_produces_a_receipt_with_durations() {
        use crate::services::pin;

        let mut entrega = Delivery::fixture(DeliveryStatus::Matched);

        entrega
            .ensure_can_transition(DeliveryStatus::PickupConfirmed)
            .unwrap();
        entrega.status = DeliveryStatus::PickupConfirmed;
        entrega.pickup_confirmed_at = Some(Utc::now());

        entrega
            .ensure_can_transition(DeliveryStatus::InTransit)
            .unwrap();
        entrega.status = DeliveryStatus::InTransit;

        // Sem PIN validado a finalização é barrada
        assert!(
            entrega
                .ensure_can_transition(DeliveryStatus::Delivered)
                .is_err()
        );

        let resultado = pin::validate(&mut entrega, "C3D4");
        assert!(resultado.success);

        entrega
            .ensure_can_transition(DeliveryStatus::Delivered)
            .unwrap();
        entrega.status = DeliveryStatus::Delivered;
        entrega.delivered_at = Some(Utc::now());

        let comprovante = ReceiptService::new().build(
            &entrega,
            &user("Mercado Central", UserType::Lojista),
            &user("Carlos", UserType::Motoboy),
        );

        assert!(comprovante.matched_to_pickup_minutes.is_some());
        assert!(comprovante.pickup_to_delivery_minutes.is_some());
        assert_eq!(comprovante.delivery_id, entrega.id);
    }

    #[test]
    fn missing_matched_timestamp_only_omits_the_first_duration() {
        let agora = Utc::now();
        let mut entrega = Delivery::fixture(DeliveryStatus::Delivered);
        entrega.matched_at = None;
        entrega.pickup_confirmed_at = Some(agora - Duration::minutes(20));
        entrega.delivered_at = Some(agora);

        let comprovante = ReceiptService::new().build(
            &entrega,
            &user("Mercado Central", UserType::Lojista),
            &user("Carlos", UserType::Motoboy),
        );

        assert_eq!(comprovante.matched_to_pickup_minutes, None);
        assert_eq!(comprovante.pickup_to_delivery_minutes, Some(20));
    }
}

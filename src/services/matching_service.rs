// src/services/matching_service.rs

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{common::error::AppError, db::UserRepository, models::auth::CourierCandidate};

// Motoboy escolhido pelo matching, já reservado.
#[derive(Debug, Clone)]
pub struct MatchedCourier {
    pub id: Uuid,
    pub name: String,
    pub ranking_score: i32,
}

#[derive(Clone)]
pub struct MatchingService {
    user_repo: UserRepository,
}

impl MatchingService {
    pub fn new(user_repo: UserRepository) -> Self {
        Self { user_repo }
    }

    // Ordena os candidatos por mérito: ranking mais alto primeiro,
    // desempate pela menor carga ativa e depois pelo cadastro mais
    // antigo. Determinístico: a mesma lista de entrada produz sempre a
    // mesma ordem.
    fn rank_candidates(mut candidates: Vec<CourierCandidate>) -> Vec<CourierCandidate> {
        candidates.sort_by(|a, b| {
            b.ranking_score
                .cmp(&a.ranking_score)
                .then(a.active_deliveries.cmp(&b.active_deliveries))
                .then(a.created_at.cmp(&b.created_at))
        });
        candidates
    }

    // Seleciona e reserva o melhor motoboy disponível na cidade de
    // coleta. Seleção + reserva formam uma operação só: o candidato é
    // confirmado com um compare-and-swap na disponibilidade, e se outro
    // matching levar o motoboy no meio do caminho, tentamos o próximo.
    //
    // Retorna None quando ninguém está disponível: a entrega permanece
    // `pending` aguardando aceite manual, o que não é um erro.
    pub async fn reserve_best_courier(
        &self,
        conn: &mut PgConnection,
        pickup_city: &str,
    ) -> Result<Option<MatchedCourier>, AppError> {
        let candidates = self
            .user_repo
            .find_available_couriers(&mut *conn, pickup_city)
            .await?;

        for candidate in Self::rank_candidates(candidates) {
            if self.user_repo.try_reserve(&mut *conn, candidate.id).await? {
                tracing::info!(
                    "🛵 Motoboy {} reservado para entrega em {}",
                    candidate.name,
                    pickup_city
                );
                return Ok(Some(MatchedCourier {
                    id: candidate.id,
                    name: candidate.name,
                    ranking_score: candidate.ranking_score,
                }));
            }
            // Reserva perdida para outra entrega; segue para o próximo
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn candidate(
        name: &str,
        ranking_score: i32,
        active_deliveries: i64,
        registered_days_ago: i64,
    ) -> CourierCandidate {
        CourierCandidate {
            id: Uuid::new_v4(),
            name: name.to_string(),
            ranking_score,
            active_deliveries,
            created_at: Utc::now() - Duration::days(registered_days_ago),
        }
    }

    fn names(candidates: &[CourierCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.name.as_str()).collect()
    }

    #[test]
    fn highest_ranking_wins() {
        let ordenados = MatchingService::rank_candidates(vec![
            candidate("bruno", 90, 0, 10),
            candidate("ana", 120, 0, 10),
            candidate("carla", 100, 0, 10),
        ]);
        assert_eq!(names(&ordenados), ["ana", "carla", "bruno"]);
    }

    #[test]
    fn ties_break_by_lowest_active_load() {
        let ordenados = MatchingService::rank_candidates(vec![
            candidate("ocupado", 100, 3, 10),
            candidate("livre", 100, 0, 10),
        ]);
        assert_eq!(names(&ordenados), ["livre", "ocupado"]);
    }

    #[test]
    fn remaining_ties_break_by_earliest_registration() {
        let ordenados = MatchingService::rank_candidates(vec![
            candidate("novato", 100, 1, 2),
            candidate("veterano", 100, 1, 300),
        ]);
        assert_eq!(names(&ordenados), ["veterano", "novato"]);
    }

    #[test]
    fn ordering_is_deterministic() {
        let montar = || {
            vec![
                candidate("a", 100, 2, 5),
                candidate("b", 110, 0, 1),
                candidate("c", 100, 0, 50),
                candidate("d", 90, 0, 100),
            ]
        };
        let primeira = names(&MatchingService::rank_candidates(montar()))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let segunda = names(&MatchingService::rank_candidates(montar()))
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(primeira, segunda);
        assert_eq!(primeira, ["b", "c", "a", "d"]);
    }
}

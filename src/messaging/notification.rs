// Notifications - Retour d'état vers la couche UI
//
// Le contrôleur de lecture publie ici le texte de statut et le libellé du
// bouton lecture/stop; l'UI (ou le binaire CLI) draine et affiche.

/// Which exercise a notification concerns.
pub type ExerciseIndex = usize;

#[derive(Debug, Clone)]
pub enum Notification {
    /// User-visible status line ("Lecture en cours", "Arrêté", ...)
    Status {
        exercise: ExerciseIndex,
        text: String,
    },
    /// Label of the play/stop toggle for this exercise.
    TransportLabel {
        exercise: ExerciseIndex,
        text: String,
    },
}

impl Notification {
    pub fn status(exercise: ExerciseIndex, text: impl Into<String>) -> Self {
        Notification::Status {
            exercise,
            text: text.into(),
        }
    }

    pub fn transport_label(exercise: ExerciseIndex, text: impl Into<String>) -> Self {
        Notification::TransportLabel {
            exercise,
            text: text.into(),
        }
    }
}

use serde::{Deserialize, Serialize};

/// Message shown to the sender whenever the provider rejects a request.
pub const SEND_FAILURE_MESSAGE: &str = "Error sending lease. Try Again.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    pub name: String,
    pub email_address: String,
    pub role: String,
}

impl Signer {
    pub fn new(
        name: impl Into<String>,
        email_address: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email_address: email_address.into(),
            role: role.into(),
        }
    }

    /// First required field left blank, if any.
    pub fn missing_field(&self) -> Option<SignerField> {
        [
            (SignerField::Name, &self.name),
            (SignerField::EmailAddress, &self.email_address),
            (SignerField::Role, &self.role),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignerField {
    Name,
    EmailAddress,
    Role,
}

impl std::fmt::Display for SignerField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SignerField::Name => "name",
            SignerField::EmailAddress => "email_address",
            SignerField::Role => "role",
        };
        f.write_str(name)
    }
}

/// Lease envelope handed to the e-signature provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub application_id: String,
    #[serde(default)]
    pub template_id: Option<String>,
    pub signers: Vec<Signer>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

impl SignatureRequest {
    /// Switch templates. Roles belong to a template, so every signer's role
    /// is cleared and must be picked again.
    pub fn select_template(&mut self, template_id: impl Into<String>) {
        self.template_id = Some(template_id.into());
        for signer in &mut self.signers {
            signer.role.clear();
        }
    }

    pub fn validate(&self) -> Result<(), LeaseValidationError> {
        match self.template_id.as_deref() {
            Some(template) if !template.trim().is_empty() => {}
            _ => return Err(LeaseValidationError::MissingTemplate),
        }
        if self.signers.is_empty() {
            return Err(LeaseValidationError::NoSigners);
        }
        for (index, signer) in self.signers.iter().enumerate() {
            if let Some(field) = signer.missing_field() {
                return Err(LeaseValidationError::IncompleteSigner { index, field });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaseValidationError {
    #[error("a lease template must be selected")]
    MissingTemplate,
    #[error("at least one signer is required")]
    NoSigners,
    #[error("signer {index} is missing `{field}`")]
    IncompleteSigner { index: usize, field: SignerField },
}

/// Provider response used to open the embedded signing flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureClaim {
    pub claim_url: String,
    pub client_id: String,
}
